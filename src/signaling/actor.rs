use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::slots::Slots;
use super::types::{ConnId, OutboundMessage, Peer, RelayError, Role, SlotSnapshot};

/// Commands sent to the relay actor
pub(crate) enum RelayCommand {
    Claim {
        role: Role,
        peer: Peer,
    },
    Forward {
        role: Role,
        msg: OutboundMessage,
    },
    Broadcast {
        msg: OutboundMessage,
    },
    Disconnect {
        conn: ConnId,
    },
    Snapshot {
        reply: oneshot::Sender<SlotSnapshot>,
    },
}

/// Owns both slots. Every slot read-modify-write happens inside one command,
/// so commands from a single connection apply in the order it sent them.
pub(crate) async fn relay_actor(mut rx: mpsc::Receiver<RelayCommand>) {
    let mut slots = Slots::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RelayCommand::Claim { role, peer } => {
                let (id, addr) = (peer.id, peer.addr);
                if let Some(previous) = slots.assign(role, peer) {
                    if previous.id != id {
                        info!("{} {} evicted from {} slot", previous.id, previous.addr, role);
                    }
                }
                info!("{} connected: {} ({})", role, id, addr);
            }

            RelayCommand::Forward { role, msg } => {
                if !slots.deliver(role, msg) {
                    debug!("No open {} to forward to, dropping", role);
                }
            }

            RelayCommand::Broadcast { msg } => {
                for role in Role::ALL {
                    if !slots.deliver(role, msg.clone()) {
                        debug!("No open {} for broadcast", role);
                    }
                }
            }

            RelayCommand::Disconnect { conn } => {
                for role in slots.release(conn) {
                    info!("{} disconnected: {}", role, conn);
                }
            }

            RelayCommand::Snapshot { reply } => {
                let _ = reply.send(slots.snapshot());
            }
        }
    }
}

/// Handle to communicate with the relay actor
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Occupy `role`, evicting whoever held it
    pub async fn claim(&self, role: Role, peer: Peer) {
        let _ = self.tx.send(RelayCommand::Claim { role, peer }).await;
    }

    /// Deliver to one slot if it is occupied and open
    pub async fn forward(&self, role: Role, msg: OutboundMessage) {
        let _ = self.tx.send(RelayCommand::Forward { role, msg }).await;
    }

    /// Deliver to the sender slot, then the receiver slot
    pub async fn broadcast(&self, msg: OutboundMessage) {
        let _ = self.tx.send(RelayCommand::Broadcast { msg }).await;
    }

    /// Release whatever slots `conn` still occupies
    pub async fn disconnect(&self, conn: ConnId) {
        let _ = self.tx.send(RelayCommand::Disconnect { conn }).await;
    }

    pub async fn snapshot(&self) -> Result<SlotSnapshot, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RelayCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| RelayError::ActorClosed)?;
        reply_rx.await.map_err(|_| RelayError::ActorClosed)
    }
}
