//! Unix domain socket server for IPC
//!
//! Provides request-response communication for out-of-process switcher UIs,
//! forwards their gestures into the interaction controller, and pushes view
//! and event notifications to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::controller::{Command, CommandSender};
use crate::events::SwitcherEvent;
use crate::hotkey::Chord;
use crate::presentation::{BroadcastSurface, Gesture, SwitcherView};

use super::protocol::{DaemonStatus, Notification, Request, Response, MAX_FRAME_LEN};

/// Outbound frames buffered per client before pushes start to wait
const CLIENT_QUEUE: usize = 64;

/// Handles into the interaction context shared with every client
#[derive(Clone)]
pub struct Bridge {
    /// Gestures go here
    pub commands: CommandSender,
    /// Views rendered by the controller
    pub views: BroadcastSurface,
    /// Events emitted by the controller
    pub events: broadcast::Sender<SwitcherEvent>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    bridge: Bridge,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

#[derive(Clone)]
struct ClientContext {
    state: Arc<RwLock<ServerState>>,
    bridge: Bridge,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, bridge: Bridge) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict socket permissions")?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::default(),
            start_time: Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            bridge,
        })
    }

    /// Record the trigger chord and whether the global hook came up
    pub async fn set_hotkey(&self, chord: &Chord, registered: bool) {
        let mut state = self.state.write().await;
        state.status.chord = chord.to_string();
        state.status.hotkey_registered = registered;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let ctx = ClientContext {
                        state: Arc::clone(&self.state),
                        bridge: self.bridge.clone(),
                    };
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, ctx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Responses and notifications share one outbound queue so frames are
    /// never interleaved on the socket.
    async fn handle_client(stream: UnixStream, ctx: ClientContext) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(CLIENT_QUEUE);

        let writer_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(?e, "client write failed");
                    break;
                }
            }
        });

        let mut forwarder = None;
        let result = Self::serve_requests(&mut reader, &out_tx, &ctx, &mut forwarder).await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        let _ = writer_task.await;

        result
    }

    async fn serve_requests<R: AsyncRead + Unpin>(
        reader: &mut R,
        out_tx: &mpsc::Sender<Vec<u8>>,
        ctx: &ClientContext,
        forwarder: &mut Option<JoinHandle<()>>,
    ) -> Result<()> {
        loop {
            let Some(body) = read_frame(reader).await? else {
                debug!("client disconnected");
                return Ok(());
            };

            let request: Request = match serde_json::from_slice(&body) {
                Ok(request) => request,
                Err(e) => {
                    debug!(?e, "unparseable request");
                    push(out_tx, &Response::error("bad_request", e.to_string())).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            let (response, subscribe) = Self::process_request(request, ctx).await;

            if subscribe && forwarder.is_none() {
                // Receivers exist before the confirmation goes out
                let (current, views) = ctx.bridge.views.subscribe_with_current();
                let events = ctx.bridge.events.subscribe();
                push(out_tx, &response).await?;
                *forwarder = Some(spawn_forwarder(views, events, current, out_tx.clone()));
                debug!("client subscribed to notifications");
            } else {
                push(out_tx, &response).await?;
            }
        }
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, ctx: &ClientContext) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = ctx.state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                state.status.apply_view(&ctx.bridge.views.current());
                (Response::Status(state.status.clone()), false)
            }

            Request::Subscribe => (Response::Subscribed, true),

            other => match other.gesture() {
                Some(gesture) => (Self::forward(gesture, &ctx.bridge.commands), false),
                None => (Response::error("bad_request", "unsupported request"), false),
            },
        }
    }

    fn forward(gesture: Gesture, commands: &CommandSender) -> Response {
        match commands.try_send(Command::Gesture(gesture)) {
            Ok(()) => {
                debug!(?gesture, "gesture forwarded via IPC");
                Response::Accepted
            }
            Err(TrySendError::Full(_)) => {
                warn!(?gesture, "controller queue full, gesture dropped");
                Response::error("busy", "controller queue is full")
            }
            Err(TrySendError::Closed(_)) => {
                Response::error("unavailable", "controller is not running")
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

fn spawn_forwarder(
    mut views: broadcast::Receiver<SwitcherView>,
    mut events: broadcast::Receiver<SwitcherEvent>,
    current: SwitcherView,
    out_tx: mpsc::Sender<Vec<u8>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if push(&out_tx, &Notification::View { view: current }).await.is_err() {
            return;
        }

        loop {
            let notification = tokio::select! {
                view = views.recv() => match view {
                    Ok(view) => Notification::View { view },
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind views");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                event = events.recv() => match event {
                    Ok(event) => Notification::Event { event },
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if push(&out_tx, &notification).await.is_err() {
                break;
            }
        }
    })
}

/// Read one length-prefixed frame; `None` on a clean disconnect
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Encode a length-prefixed JSON message
fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    let len = u32::try_from(body.len()).context("message too large")?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

async fn push<T: Serialize>(out_tx: &mpsc::Sender<Vec<u8>>, msg: &T) -> Result<()> {
    let frame = encode_frame(msg)?;
    out_tx
        .send(frame)
        .await
        .map_err(|_| anyhow!("client writer closed"))
}
