//! Change notifications for state subscribers.
//!
//! The store broadcasts identifier-only events; subscribers re-query current
//! state instead of receiving snapshots. Delivery is queued and asynchronous:
//! an emission is not guaranteed to reach subscribers before the triggering
//! call returns, but a single broadcast channel keeps all emissions in order,
//! so events for the same key are always observed in emission order.

use tokio::sync::broadcast;

/// A state change observers can react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The pending federation invitation count for an account changed.
    PendingInvitationsChanged { account_id: String },
    /// The capability set resolved for a room changed.
    RoomCapabilitiesChanged {
        account_id: String,
        room_token: String,
    },
}

/// Broadcast bus for [`ChangeEvent`]s.
///
/// Slow subscribers that lag behind the channel capacity miss the oldest
/// events (`RecvError::Lagged`); since payloads carry only identifiers and
/// subscribers re-query, a missed event coalesces into the next one.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Fire-and-forget: having no subscribers is not an error.
    pub fn emit(&self, event: ChangeEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(?event, "No subscribers for change event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_emission_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        for n in 0..3 {
            bus.emit(ChangeEvent::PendingInvitationsChanged {
                account_id: format!("acct-{n}"),
            });
        }

        for n in 0..3 {
            let event = rx.recv().await.expect("event");
            assert_eq!(
                event,
                ChangeEvent::PendingInvitationsChanged {
                    account_id: format!("acct-{n}"),
                }
            );
        }
    }

    #[test]
    fn emit_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        bus.emit(ChangeEvent::RoomCapabilitiesChanged {
            account_id: "acct".into(),
            room_token: "room".into(),
        });
    }
}
