//! WebSocket signaling relay for a single sender/receiver session

mod actor;
mod messages;
mod server;
mod slots;
mod types;

pub use actor::RelayHandle;
pub use messages::{Envelope, Route};
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use types::{ConnId, OutboundMessage, Peer, RelayError, Role, SlotSnapshot};
