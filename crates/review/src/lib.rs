//! Review coordination: suspends a node pending reviewer feedback, decides
//! approve/reject/request-changes, and synthesizes retry instructions.

mod coordinator;
mod error;
mod model;
mod synthesis;

pub use coordinator::ReviewCoordinator;
pub use error::ReviewError;
pub use model::{
    FinalDecision, ReviewDecision, ReviewFeedback, ReviewRequest, ReviewResult, ReviewScope, ReviewStatus, Severity,
};
pub use synthesis::{compose_modified_instructions, extract_suggestions};
