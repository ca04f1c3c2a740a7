use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Delivery handle for one member: the sending half of its outbound queue.
/// Frames are written to the client verbatim.
pub type Outbound = mpsc::Sender<String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("'{0}' is not in the room")]
    NotMember(String),
    #[error("outbound queue for '{0}' is full")]
    Backlogged(String),
    #[error("'{0}' is no longer reading")]
    Disconnected(String),
}

/// The live set of named participants.
///
/// Every operation is atomic on its own; the map itself is never handed out,
/// so callers cannot iterate it while another session mutates it.
#[derive(Clone)]
pub struct Room {
    members: Arc<DashMap<String, Outbound>>,
    server_name: Arc<str>,
}

impl Room {
    pub fn new(server_name: impl Into<Arc<str>>) -> Self {
        Self {
            members: Arc::new(DashMap::new()),
            server_name: server_name.into(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Claims `name` for `handle` if nobody holds it. The check and the insert
    /// happen under the same shard lock, so of several sessions racing for a
    /// name exactly one gets `true`.
    pub fn reserve(&self, name: &str, handle: Outbound) -> bool {
        if name.is_empty() || name == &*self.server_name {
            return false;
        }

        match self.members.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    /// Idempotent.
    pub fn remove(&self, name: &str) {
        self.members.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Point-in-time copy of the member names, sorted.
    pub fn members(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Queues `line` for `name` without waiting. A full queue or a closed
    /// writer loses the line for that member only.
    pub fn deliver(&self, name: &str, line: &str) -> Result<(), DeliveryError> {
        let handle = self
            .members
            .get(name)
            .map(|guard| guard.clone())
            .ok_or_else(|| DeliveryError::NotMember(name.to_string()))?;

        handle
            .try_send(format!("{}\n", line))
            .map_err(|err| match err {
                TrySendError::Full(_) => DeliveryError::Backlogged(name.to_string()),
                TrySendError::Closed(_) => DeliveryError::Disconnected(name.to_string()),
            })
    }
}
