//! Per-subscriber room-based fan-out, backed by one `broadcast` channel per
//! room, created lazily on first subscribe or publish.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::event::Event;
use crate::history::HistoryStore;
use crate::room::Room;

const ROOM_CHANNEL_CAPACITY: usize = 256;

pub struct Subscription {
    pub receiver: broadcast::Receiver<Event>,
    /// Present only for `Room::Flow` subscriptions: the last ≤100 events
    /// recorded for that flow, delivered to the caller before live events.
    pub history: Vec<Event>,
}

/// Fan-out hub. Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Default)]
pub struct EventMultiplexer {
    rooms: Mutex<HashMap<Room, broadcast::Sender<Event>>>,
    history: HistoryStore,
}

impl EventMultiplexer {
    pub fn new() -> Self {
        Self { rooms: Mutex::new(HashMap::new()), history: HistoryStore::new() }
    }

    pub fn subscribe(&self, room: Room) -> Subscription {
        let history = if let Room::Flow(flow_id) = &room { self.history.snapshot(*flow_id) } else { Vec::new() };
        let receiver = self.sender_for(&room).subscribe();
        Subscription { receiver, history }
    }

    /// Deliver `event` to every room it belongs to. Best-effort: a room with
    /// no current subscribers silently drops the event, per the at-most-once
    /// delivery guarantee.
    pub fn publish(&self, event: Event) {
        if let Some(flow_id) = event.flow_id {
            self.history.record(flow_id, event.clone());
        }
        for room in Room::memberships(&event) {
            let sender = self.sender_for(&room);
            let _ = sender.send(event.clone());
        }
    }

    fn sender_for(&self, room: &Room) -> broadcast::Sender<Event> {
        let mut rooms = self.rooms.lock().expect("room map lock poisoned");
        rooms.entry(room.clone()).or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_published_event_in_its_room() {
        let mux = EventMultiplexer::new();
        let flow_id = Uuid::new_v4();
        let mut sub = mux.subscribe(Room::Flow(flow_id));

        mux.publish(Event::new(EventKind::FlowStarted, json!({})).with_flow(flow_id));

        let received = sub.receiver.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::FlowStarted);
    }

    #[tokio::test]
    async fn late_joiner_gets_history_snapshot() {
        let mux = EventMultiplexer::new();
        let flow_id = Uuid::new_v4();
        mux.publish(Event::new(EventKind::FlowStarted, json!({})).with_flow(flow_id));
        mux.publish(Event::new(EventKind::NodeStarted, json!({})).with_flow(flow_id));

        let sub = mux.subscribe(Room::Flow(flow_id));
        assert_eq!(sub.history.len(), 2);
        assert_eq!(sub.history[0].kind, EventKind::FlowStarted);
    }

    #[tokio::test]
    async fn unrelated_rooms_do_not_cross_deliver() {
        let mux = EventMultiplexer::new();
        let flow_a = Uuid::new_v4();
        let flow_b = Uuid::new_v4();
        let mut sub_b = mux.subscribe(Room::Flow(flow_b));

        mux.publish(Event::new(EventKind::FlowStarted, json!({})).with_flow(flow_a));

        assert!(sub_b.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn node_room_receives_only_events_naming_that_node() {
        let mux = EventMultiplexer::new();
        let mut sub = mux.subscribe(Room::Node("n1".to_string()));

        mux.publish(Event::new(EventKind::NodeCompleted, json!({})).with_node("n1"));
        mux.publish(Event::new(EventKind::NodeCompleted, json!({})).with_node("n2"));

        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.node_id.as_deref(), Some("n1"));
        assert!(sub.receiver.try_recv().is_err());
    }
}
