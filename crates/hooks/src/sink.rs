//! The `engine` crate implements [`HookSink`] so this crate never depends
//! back on it — the hook ingress stays a leaf dependency.

use crate::event::HookEvent;

pub trait HookSink: Send + Sync {
    fn dispatch(&self, event: HookEvent);
}
