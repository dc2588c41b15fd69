//! Per-flow bounded event history so late joiners can catch up.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use uuid::Uuid;

use crate::event::Event;

const DEFAULT_CAPACITY: usize = 100;

#[derive(Default)]
pub struct HistoryStore {
    capacity: usize,
    by_flow: Mutex<HashMap<Uuid, VecDeque<Event>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, by_flow: Mutex::new(HashMap::new()) }
    }

    pub fn record(&self, flow_id: Uuid, event: Event) {
        let mut by_flow = self.by_flow.lock().expect("history lock poisoned");
        let ring = by_flow.entry(flow_id).or_default();
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(event);
    }

    pub fn snapshot(&self, flow_id: Uuid) -> Vec<Event> {
        let by_flow = self.by_flow.lock().expect("history lock poisoned");
        by_flow.get(&flow_id).map(|ring| ring.iter().cloned().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use serde_json::json;

    #[test]
    fn retains_only_the_last_capacity_events_in_arrival_order() {
        let store = HistoryStore::with_capacity(3);
        let flow_id = Uuid::new_v4();
        for i in 0..5 {
            store.record(flow_id, Event::new(EventKind::NodeUpdate, json!({ "i": i })));
        }
        let snapshot = store.snapshot(flow_id);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].payload["i"], json!(2));
        assert_eq!(snapshot[2].payload["i"], json!(4));
    }

    #[test]
    fn separate_flows_have_independent_history() {
        let store = HistoryStore::new();
        let flow_a = Uuid::new_v4();
        let flow_b = Uuid::new_v4();
        store.record(flow_a, Event::new(EventKind::FlowStarted, json!({})));
        assert_eq!(store.snapshot(flow_a).len(), 1);
        assert_eq!(store.snapshot(flow_b).len(), 0);
    }
}
