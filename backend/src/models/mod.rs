//! Domain models for the queue simulator

pub mod event;
pub mod job;
pub mod resource;

// Re-exports
pub use event::{EventKind, EventLog, EventRecord, RejectionCause};
pub use job::{Job, JobError, JobId, JobPhase};
pub use resource::{Admission, Dispatch, Resource, ResourceStats, ResourceStatus};
