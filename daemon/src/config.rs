//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::controller::Timing;
use crate::hotkey::Chord;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Trigger chord
    pub chord: Chord,

    /// Keep chord keystrokes away from the focused application
    pub swallow_chord: bool,

    /// Hold-check and refresh periods
    pub timing: Timing,

    /// Bundle identifiers that are never listed
    pub excluded: Vec<String>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("holdswitch");

        let socket_path = lookup("HOLDSWITCH_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let chord = match lookup("HOLDSWITCH_CHORD") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid HOLDSWITCH_CHORD {raw:?}"))?,
            None => Chord::default(),
        };

        let swallow_chord = match lookup("HOLDSWITCH_CONSUME_CHORD") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("invalid HOLDSWITCH_CONSUME_CHORD {raw:?}"))?,
            None => true,
        };

        let defaults = Timing::default();
        let timing = Timing {
            hold_check: period(&lookup, "HOLDSWITCH_HOLD_CHECK_MS", defaults.hold_check)?,
            refresh: period(&lookup, "HOLDSWITCH_REFRESH_MS", defaults.refresh)?,
        };

        let excluded = lookup("HOLDSWITCH_EXCLUDE")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            socket_path,
            data_dir,
            chord,
            swallow_chord,
            timing,
            excluded,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn period(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid {name} {raw:?}"))?;
    if millis == 0 {
        bail!("{name} must be greater than zero");
    }
    Ok(Duration::from_millis(millis))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::hotkey::Modifier;

    fn load_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load_with(&[("HOME", "/Users/test")]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/Users/test/.local/share/holdswitch/daemon.sock")
        );
        assert_eq!(config.chord, Chord::default());
        assert!(config.swallow_chord);
        assert_eq!(config.timing, Timing::default());
        assert!(config.excluded.is_empty());
    }

    #[test]
    fn test_config_overrides() {
        let config = load_with(&[
            ("HOME", "/Users/test"),
            ("HOLDSWITCH_SOCKET", "/tmp/switch.sock"),
            ("HOLDSWITCH_CHORD", "cmd+grave"),
            ("HOLDSWITCH_CONSUME_CHORD", "no"),
            ("HOLDSWITCH_HOLD_CHECK_MS", "25"),
            ("HOLDSWITCH_REFRESH_MS", "1000"),
            ("HOLDSWITCH_EXCLUDE", "com.example.a, ,com.example.b"),
        ])
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/tmp/switch.sock"));
        assert_eq!(config.chord.modifier, Modifier::Command);
        assert!(!config.swallow_chord);
        assert_eq!(config.timing.hold_check, Duration::from_millis(25));
        assert_eq!(config.timing.refresh, Duration::from_secs(1));
        assert_eq!(config.excluded, vec!["com.example.a", "com.example.b"]);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(load_with(&[]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("HOLDSWITCH_HOLD_CHECK_MS", "0")]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("HOLDSWITCH_REFRESH_MS", "soon")]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("HOLDSWITCH_CHORD", "tab")]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("HOLDSWITCH_CONSUME_CHORD", "maybe")]).is_err());
    }
}
