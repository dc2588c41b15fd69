//! HTTP-free hook ingress: normalizes subprocess callbacks into typed
//! events, routes them by `node_id`, and keeps a diagnostic history.
//!
//! Deliberately has no `axum` dependency — the `api` crate owns the actual
//! routes and deserializes bodies into the DTOs this crate exposes, so that
//! `engine` (which implements [`HookSink`]) never needs to depend on the web
//! framework either.

mod diagnostics;
mod error;
mod event;
mod ingress;
mod payload;
mod registry;
mod sink;

pub use diagnostics::DiagnosticRing;
pub use error::HookError;
pub use event::HookEvent;
pub use ingress::HookIngress;
pub use payload::{
    AgentCompleteBody, AgentErrorBody, CheckpointBody, FileChangedBody, ReviewAction, ReviewCallbackBody,
};
pub use registry::FlowRegistry;
pub use sink::HookSink;
