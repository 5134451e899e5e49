use super::types::{ConnId, OutboundMessage, Peer, Role, SlotSnapshot};

/// The two role slots.
///
/// Each slot is `Empty` or `Occupied(peer)`. A claim replaces the occupant
/// outright (`Occupied(A) -> Occupied(B)`); only the occupant's own release
/// empties it. One peer may hold both slots.
#[derive(Debug, Default)]
pub(crate) struct Slots {
    sender: Option<Peer>,
    receiver: Option<Peer>,
}

impl Slots {
    fn slot(&self, role: Role) -> &Option<Peer> {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<Peer> {
        match role {
            Role::Sender => &mut self.sender,
            Role::Receiver => &mut self.receiver,
        }
    }

    /// Put `peer` in the slot, returning the evicted occupant (left open).
    pub fn assign(&mut self, role: Role, peer: Peer) -> Option<Peer> {
        self.slot_mut(role).replace(peer)
    }

    /// Clear every slot currently held by `conn`. Returns the cleared roles.
    pub fn release(&mut self, conn: ConnId) -> Vec<Role> {
        let mut cleared = Vec::new();
        for role in Role::ALL {
            let slot = self.slot_mut(role);
            if slot.as_ref().is_some_and(|p| p.id == conn) {
                *slot = None;
                cleared.push(role);
            }
        }
        cleared
    }

    /// Hand `msg` to the occupant if there is one and it is still open.
    pub fn deliver(&self, role: Role, msg: OutboundMessage) -> bool {
        match self.slot(role) {
            Some(peer) if peer.is_open() => peer.deliver(msg),
            _ => false,
        }
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            sender: self.sender.as_ref().map(|p| p.id),
            receiver: self.receiver.as_ref().map(|p| p.id),
        }
    }
}
