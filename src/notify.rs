use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for accepted-booking events, one channel per resource.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a resource. Creates the channel if needed.
    pub fn subscribe(&self, resource_id: &str) -> broadcast::Receiver<Event> {
        if let Some(sender) = self.channels.get(resource_id) {
            return sender.subscribe();
        }
        self.channels
            .entry(resource_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, resource_id: &str, event: &Event) {
        if let Some(sender) = self.channels.get(resource_id) {
            let _ = sender.send(event.clone());
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, resource_id: &str) -> usize {
        self.channels
            .get(resource_id)
            .map_or(0, |s| s.receiver_count())
    }
}

#[cfg(test)]
mod tests {
    use ulid::Ulid;

    use super::*;
    use crate::model::Span;

    fn accepted(resource_id: &str) -> Event {
        Event::BookingAccepted {
            id: Ulid::new(),
            resource_id: resource_id.into(),
            event_name: "Seminar".into(),
            span: Span::new(9, 10),
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("R101");

        let event = accepted("R101");
        hub.send("R101", &event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
        assert_eq!(received.resource_id(), "R101");
    }

    #[tokio::test]
    async fn other_resources_are_not_delivered() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("R101");
        hub.send("L201", &accepted("L201"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // No subscribers: send is a no-op
        hub.send("R101", &accepted("R101"));
        assert_eq!(hub.subscriber_count("R101"), 0);
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let hub = NotifyHub::new();
        let rx1 = hub.subscribe("A301");
        let _rx2 = hub.subscribe("A301");
        assert_eq!(hub.subscriber_count("A301"), 2);
        drop(rx1);
        assert_eq!(hub.subscriber_count("A301"), 1);
    }
}
