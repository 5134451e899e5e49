use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Utf8Bytes};

/// Relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("envelope is null")]
    NullEnvelope,

    #[error("binary frame is not valid UTF-8")]
    NotUtf8,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("relay actor channel closed")]
    ActorClosed,
}

/// One of the two addressable positions in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Sender, Role::Receiver];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }

    /// Exact match only: `"Sender"` or `" receiver"` are not roles.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(Role::Sender),
            "receiver" => Some(Role::Receiver),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-local connection identity, handed out by the listener in accept order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

impl From<u64> for ConnId {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

/// A live connection as seen by the slot owner.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: ConnId,
    pub addr: SocketAddr,
    /// Drained by the connection's writer task. Once that task ends the
    /// receiver is dropped and the peer counts as closed.
    pub tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Peer {
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Fire-and-forget. Returns false when the peer is already closed.
    pub fn deliver(&self, msg: OutboundMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Current occupants of both slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub sender: Option<ConnId>,
    pub receiver: Option<ConnId>,
}

impl SlotSnapshot {
    pub fn get(&self, role: Role) -> Option<ConnId> {
        match role {
            Role::Sender => self.sender,
            Role::Receiver => self.receiver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_from_wire_is_exact() {
        assert_eq!(Role::from_wire("sender"), Some(Role::Sender));
        assert_eq!(Role::from_wire("receiver"), Some(Role::Receiver));
        assert_eq!(Role::from_wire("Receiver"), None);
        assert_eq!(Role::from_wire("both"), None);
        assert_eq!(Role::from_wire(""), None);
    }

    #[test]
    fn role_serialization() {
        let json = serde_json::to_string(&Role::Receiver).unwrap();
        assert_eq!(json, "\"receiver\"");
        let role: Role = serde_json::from_str("\"sender\"").unwrap();
        assert_eq!(role, Role::Sender);
    }

    #[test]
    fn role_display() {
        assert_eq!(format!("{}", Role::Sender), "sender");
        assert_eq!(format!("{}", Role::Receiver), "receiver");
    }

    #[test]
    fn conn_id_display_and_next() {
        let id = ConnId::from(7);
        assert_eq!(format!("{}", id), "conn#7");
        assert_eq!(id.next(), ConnId::from(8));
    }

    #[test]
    fn peer_closes_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Peer {
            id: ConnId::from(1),
            addr: "127.0.0.1:9000".parse().unwrap(),
            tx,
        };
        assert!(peer.is_open());
        assert!(peer.deliver(OutboundMessage::from("x".to_string())));

        drop(rx);
        assert!(!peer.is_open());
        assert!(!peer.deliver(OutboundMessage::from("y".to_string())));
    }

    #[test]
    fn snapshot_lookup_by_role() {
        let snap = SlotSnapshot {
            sender: Some(ConnId::from(1)),
            receiver: None,
        };
        assert_eq!(snap.get(Role::Sender), Some(ConnId::from(1)));
        assert_eq!(snap.get(Role::Receiver), None);
    }
}
