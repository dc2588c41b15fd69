//! Bounded rolling log of recent hook events, kept for diagnostics
//! independent of any per-flow history the Event Multiplexer keeps.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::event::HookEvent;

const DEFAULT_CAPACITY: usize = 1000;

pub struct DiagnosticRing {
    capacity: usize,
    events: Mutex<VecDeque<HookEvent>>,
}

impl DiagnosticRing {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, events: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn record(&self, event: HookEvent) {
        let mut events = self.events.lock().expect("diagnostic ring lock poisoned");
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<HookEvent> {
        let events = self.events.lock().expect("diagnostic ring lock poisoned");
        events.iter().cloned().collect()
    }
}

impl Default for DiagnosticRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn event(node_id: &str) -> HookEvent {
        HookEvent::Error { flow_id: Uuid::new_v4(), node_id: node_id.into(), error: "boom".into(), at: chrono::Utc::now() }
    }

    #[test]
    fn evicts_oldest_once_over_capacity() {
        let ring = DiagnosticRing::with_capacity(2);
        ring.record(event("n1"));
        ring.record(event("n2"));
        ring.record(event("n3"));
        let snapshot = ring.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].node_id(), "n2");
        assert_eq!(snapshot[1].node_id(), "n3");
    }

    #[test]
    fn checkpoint_roundtrips_data() {
        let data = json!({ "progress": 0.5 });
        let ev = HookEvent::Checkpoint {
            flow_id: Uuid::new_v4(),
            node_id: "n1".into(),
            name: "halfway".into(),
            data: data.clone(),
            at: chrono::Utc::now(),
        };
        let ring = DiagnosticRing::new();
        ring.record(ev);
        let snapshot = ring.snapshot();
        match &snapshot[0] {
            HookEvent::Checkpoint { data: got, .. } => assert_eq!(got, &data),
            _ => panic!("expected checkpoint"),
        }
    }
}
