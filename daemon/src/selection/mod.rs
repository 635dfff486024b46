//! Selection engine module
//!
//! Holds the candidate list and the cursor, and reconciles the cursor
//! by identity when the list is refreshed.

mod engine;

pub use engine::{Selection, SelectionEngine};
