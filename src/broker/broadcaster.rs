//! Fan-out of published lines
//!
//! `publish` takes a snapshot of the subscriber set and writes the line to
//! every subscriber concurrently, each write bounded by the write timeout.
//! Delivery is best-effort: a subscriber whose write fails or stalls is
//! unregistered and told to close, and the remaining subscribers are not
//! affected. The publisher is never told about partial delivery.
//!
//! A failed write leaves its subscriber permanently failed, so publishers
//! holding an older snapshot cannot append to a half-written line.
//!
//! Callers await `publish` before handing over the next line, which keeps
//! lines from one publisher in order for every subscriber.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::broker::message::Message;
use crate::broker::registry::Registry;
use crate::client::Subscriber;

#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    write_timeout: Duration,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>, write_timeout: Duration) -> Self {
        Self {
            registry,
            write_timeout,
        }
    }

    /// Delivers `message` to the current subscribers.
    ///
    /// Returns how many subscribers accepted the write.
    pub async fn publish(&self, message: &Message) -> usize {
        let subscribers = self.registry.snapshot_subscribers();
        if subscribers.is_empty() {
            debug!("No subscribers for: {}", message);
            return 0;
        }

        let writes = subscribers.iter().map(|sub| self.deliver(sub, message));
        let outcomes = join_all(writes).await;

        let mut delivered = 0;
        for (sub, ok) in subscribers.iter().zip(outcomes) {
            if ok {
                delivered += 1;
            } else {
                self.drop_subscriber(sub);
            }
        }
        delivered
    }

    async fn deliver(&self, sub: &Subscriber, message: &Message) -> bool {
        match sub.send(message, self.write_timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send to {} ({}): {}", sub.id(), sub.info.addr, e);
                false
            }
        }
    }

    fn drop_subscriber(&self, sub: &Subscriber) {
        // Concurrent publishes may both see the same dead subscriber; only the first removal counts.
        if self.registry.unregister(&sub.id()).is_some() {
            debug!("Removed unreachable subscriber {}", sub.id());
        }
        sub.close();
    }
}
