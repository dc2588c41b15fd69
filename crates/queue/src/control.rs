//! Per-queue pause/resume gate, consulted by [`crate::worker::Worker`]
//! between polls. Pausing a queue is an in-memory control-plane action —
//! it doesn't touch the durable job rows, only whether workers keep
//! pulling from them.

use std::collections::HashMap;
use std::sync::Mutex;

use db::models::QueueKind;
use tokio::sync::watch;

pub struct QueueControl {
    gates: Mutex<HashMap<&'static str, watch::Sender<bool>>>,
}

impl Default for QueueControl {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueControl {
    pub fn new() -> Self {
        Self { gates: Mutex::new(HashMap::new()) }
    }

    fn gate(&self, kind: QueueKind) -> watch::Sender<bool> {
        let mut gates = self.gates.lock().expect("queue control lock poisoned");
        gates.entry(crate::job::queue_name(kind)).or_insert_with(|| watch::channel(true).0).clone()
    }

    pub fn pause(&self, kind: QueueKind) {
        let _ = self.gate(kind).send(false);
    }

    pub fn resume(&self, kind: QueueKind) {
        let _ = self.gate(kind).send(true);
    }

    pub fn is_running(&self, kind: QueueKind) -> bool {
        *self.gate(kind).borrow()
    }

    pub fn subscribe(&self, kind: QueueKind) -> watch::Receiver<bool> {
        self.gate(kind).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_start_running() {
        let control = QueueControl::new();
        assert!(control.is_running(QueueKind::Flow));
        assert!(control.is_running(QueueKind::Node));
    }

    #[test]
    fn pausing_one_queue_does_not_affect_the_other() {
        let control = QueueControl::new();
        control.pause(QueueKind::Node);
        assert!(!control.is_running(QueueKind::Node));
        assert!(control.is_running(QueueKind::Flow));

        control.resume(QueueKind::Node);
        assert!(control.is_running(QueueKind::Node));
    }
}
