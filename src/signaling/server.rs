use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Bytes, Message, Utf8Bytes};
use tracing::{debug, info, warn};

use super::actor::{RelayCommand, RelayHandle, relay_actor};
use super::messages::{Envelope, Route};
use super::types::{ConnId, OutboundMessage, Peer, RelayError};

pub const DEFAULT_SIGNALING_PORT: u16 = 3004;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

pub struct SignalingServer {
    listener: TcpListener,
    handle: RelayHandle,
}

impl SignalingServer {
    /// Bind the listener and start the relay actor
    pub async fn bind(addr: &str) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(addr).await?;
        let (tx, rx) = mpsc::channel::<RelayCommand>(1024);
        tokio::spawn(relay_actor(rx));

        info!("Signaling server listening on ws://{}", listener.local_addr()?);

        Ok(Self {
            listener,
            handle: RelayHandle { tx },
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<(), RelayError> {
        let mut next_id = ConnId::from(1);
        let mut failures: u32 = 0;

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => {
                    failures = 0;
                    accepted
                }
                Err(e) => {
                    // e.g. EMFILE: retrying immediately would spin
                    let delay = accept_backoff(failures);
                    failures = failures.saturating_add(1);
                    warn!("Accept failed: {}, retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
            let id = next_id;
            next_id = next_id.next();
            let handle = self.handle.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, id, handle).await {
                    warn!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

/// Doubles per consecutive failure, capped
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1u32 << failures.min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ConnId,
    handle: RelayHandle,
) -> Result<(), RelayError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (ws_tx, ws_rx) = ws_stream.split();

    info!("Client connected: {} ({})", id, addr);

    let (tx, rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let peer = Peer { id, addr, tx };
    let writer = tokio::spawn(write_loop(ws_tx, rx, PING_INTERVAL, addr));

    serve_peer(ws_rx, peer, handle, writer).await;
    info!("Client disconnected: {} ({})", id, addr);

    Ok(())
}

/// Drains the peer's outbound channel into the socket, pinging as a keepalive.
/// A missing pong never ends the loop, a failed write does.
async fn write_loop<S>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ping_every: Duration,
    addr: SocketAddr,
) where
    S: Sink<Message> + Unpin,
{
    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                if sink.send(Message::Text(msg.into_inner())).await.is_err() {
                    warn!("Write to {} failed", addr);
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    warn!("Ping to {} failed", addr);
                    break;
                }
                debug!("Ping sent to {}", addr);
            }
        }
    }
}

/// Reads frames until the socket closes, errors, or the writer stops,
/// then releases the peer's slots.
async fn serve_peer<S>(mut frames: S, peer: Peer, handle: RelayHandle, mut writer: JoinHandle<()>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let addr = peer.addr;

    loop {
        let msg = tokio::select! {
            msg = frames.next() => msg,
            _ = &mut writer => {
                info!("Writer for {} stopped, closing", addr);
                break;
            }
        };

        let msg = match msg {
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                warn!("WebSocket error from {}: {}", addr, e);
                break;
            }
            None => break,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(data) => match binary_to_text(data) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Dropping frame from {}: {}", addr, e);
                    continue;
                }
            },
            Message::Close(_) => {
                info!("Close received from {}", addr);
                break;
            }
            _ => continue,
        };

        if let Err(e) = handle_text_message(text, &peer, &handle).await {
            warn!("Dropping envelope from {}: {}", addr, e);
        }
    }

    handle.disconnect(peer.id).await;
    writer.abort();
}

fn binary_to_text(data: Bytes) -> Result<Utf8Bytes, RelayError> {
    Utf8Bytes::try_from(data).map_err(|_| RelayError::NotUtf8)
}

async fn handle_text_message(
    text: Utf8Bytes,
    peer: &Peer,
    handle: &RelayHandle,
) -> Result<(), RelayError> {
    let envelope = Envelope::parse(text.as_str())?;

    match envelope.route() {
        Route::Claim(role) => handle.claim(role, peer.clone()).await,
        Route::Forward(role) => {
            debug!("{} from {} -> {}", envelope.kind(), peer.id, role);
            handle.forward(role, OutboundMessage::new(text)).await;
        }
        Route::Broadcast => {
            debug!("{} from {} -> broadcast", envelope.kind(), peer.id);
            handle.broadcast(OutboundMessage::new(text)).await;
        }
        Route::Discard => {
            debug!(
                "Dropping {} from {}: target {:?} not routable",
                envelope.kind(),
                peer.id,
                envelope.target()
            );
        }
    }

    Ok(())
}
