//! Bookkeeping for listeners a view registers, so deactivation removes
//! exactly those and nothing else.

use tracing::debug;

use crate::dom::{Document, DomError, Listener, ListenerId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedListener {
    pub target: NodeId,
    pub event_type: String,
    pub id: ListenerId,
}

#[derive(Debug, Default)]
pub struct ListenerSet {
    entries: Vec<TrackedListener>,
}

impl ListenerSet {
    pub fn add(
        &mut self,
        document: &Document,
        target: NodeId,
        event_type: &str,
        listener: Listener,
    ) -> Result<ListenerId, DomError> {
        let id = document.add_event_listener(target, event_type, listener)?;
        self.entries.push(TrackedListener {
            target,
            event_type: event_type.to_string(),
            id,
        });
        Ok(id)
    }

    /// Removes every tracked listener from `document` and forgets them.
    /// Entries that no longer exist in the document are skipped. Returns the
    /// number actually removed.
    pub fn release(&mut self, document: &Document) -> usize {
        let mut removed = 0;
        for entry in self.entries.drain(..) {
            if document.remove_event_listener(entry.id) {
                removed += 1;
            } else {
                debug!(
                    target_node = %entry.target,
                    event = %entry.event_type,
                    "listener already gone; skipping"
                );
            }
        }
        removed
    }

    pub fn entries(&self) -> &[TrackedListener] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/listeners_tests.rs"]
mod tests;
