use std::{collections::HashMap, fmt};

use tokio::sync::mpsc;
use uuid::Uuid;

/// Dropping the last sender closes the connection.
pub type Outbox = mpsc::Sender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    members: HashMap<ConnectionId, Outbox>,
}

impl ConnectionRegistry {
    pub(crate) fn insert(&mut self, id: ConnectionId, outbox: Outbox) -> bool {
        self.members.insert(id, outbox).is_none()
    }

    pub(crate) fn remove(&mut self, id: &ConnectionId) -> bool {
        self.members.remove(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &Outbox)> {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut registry = ConnectionRegistry::default();
        let (outbox, _inbox) = mpsc::channel(1);
        let id = ConnectionId::new();

        assert!(registry.insert(id, outbox.clone()));
        assert!(!registry.insert(id, outbox));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_ids_are_distinct() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
