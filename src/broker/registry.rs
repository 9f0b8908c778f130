//! Registry of classified connections
//!
//! Holds the only long-lived shared state of the relay: the set of active
//! publishers and the set of active subscribers. Both sets live behind a
//! single `std::sync::Mutex`. The lock is only ever held for in-memory
//! bookkeeping, never across an `.await` or any network I/O; callers that need
//! to write to subscribers take a snapshot and release the lock first.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::client::{ConnectionId, PeerInfo, Role, Subscriber};

/// A classified connection, ready to be registered.
#[derive(Debug, Clone)]
pub enum Member {
    Publisher(PeerInfo),
    Subscriber(Subscriber),
}

impl Member {
    pub fn id(&self) -> ConnectionId {
        match self {
            Member::Publisher(info) => info.id,
            Member::Subscriber(sub) => sub.id(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Member::Publisher(_) => Role::Publisher,
            Member::Subscriber(_) => Role::Subscriber,
        }
    }
}

#[derive(Debug, Default)]
struct Sets {
    publishers: HashMap<ConnectionId, PeerInfo>,
    subscribers: HashMap<ConnectionId, Subscriber>,
}

#[derive(Debug, Default)]
pub struct Registry {
    sets: Mutex<Sets>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sets> {
        // The sets stay consistent even if a holder panicked; every mutation is a single insert/remove.
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a member to the set matching its role.
    ///
    /// A connection is never in both sets: registering an id that is already
    /// present under the other role moves it.
    pub fn register(&self, member: Member) {
        let id = member.id();
        debug!("Registering {} as {}", id, member.role());
        let mut sets = self.lock();
        match member {
            Member::Publisher(info) => {
                sets.subscribers.remove(&id);
                sets.publishers.insert(id, info);
            }
            Member::Subscriber(sub) => {
                sets.publishers.remove(&id);
                sets.subscribers.insert(id, sub);
            }
        }
    }

    /// Removes `id` from whichever set holds it.
    ///
    /// Returns the role it was registered under, or `None` if it was already
    /// gone, so exactly one caller observes the removal.
    pub fn unregister(&self, id: &ConnectionId) -> Option<Role> {
        let mut sets = self.lock();
        if sets.publishers.remove(id).is_some() {
            Some(Role::Publisher)
        } else if sets.subscribers.remove(id).is_some() {
            Some(Role::Subscriber)
        } else {
            None
        }
    }

    /// Point-in-time copy of the subscriber set, safe to iterate without the lock.
    pub fn snapshot_subscribers(&self) -> Vec<Subscriber> {
        self.lock().subscribers.values().cloned().collect()
    }

    pub fn role_of(&self, id: &ConnectionId) -> Option<Role> {
        let sets = self.lock();
        if sets.publishers.contains_key(id) {
            Some(Role::Publisher)
        } else if sets.subscribers.contains_key(id) {
            Some(Role::Subscriber)
        } else {
            None
        }
    }

    pub fn publisher_count(&self) -> usize {
        self.lock().publishers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}
