//! `queue` crate — the durable flow-queue/node-queue pair that feeds the
//! flow executor, backed by the `job_queue` Postgres table.

pub mod control;
pub mod error;
pub mod job;
pub mod queue;
pub mod worker;

pub use db::models::QueueKind;
pub use error::QueueError;
pub use job::{FlowJob, NodeJob};
pub use queue::{JobQueue, QueueCounts};
pub use worker::{JobProcessor, Worker};
