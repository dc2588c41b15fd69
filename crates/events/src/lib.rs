//! Event multiplexer: room-based fan-out of flow/node/hook events, with
//! bounded per-flow history for late joiners and role-gated control actions.

mod error;
mod event;
mod history;
mod multiplexer;
mod room;

pub use error::EventsError;
pub use event::{Event, EventKind};
pub use history::HistoryStore;
pub use multiplexer::{EventMultiplexer, Subscription};
pub use room::{ControlAction, Role, Room};
