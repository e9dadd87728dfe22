//! Conflict resolution for the Anchored Stream Log.
//!
//! Writers race. [`resolve`] decides what to do with one candidate commit
//! against the local log, [`select_log`] decides between two complete logs,
//! and [`ConflictResolver`] applies those decisions to a
//! [`StreamHandle`](asl_stream::StreamHandle), validating anchor proofs
//! outside the per-stream lock and re-checking under it.

pub mod decision;
pub mod error;
pub mod resolver;
pub mod select;

pub use decision::{resolve, Decision, RejectReason};
pub use error::{ConflictError, ConflictResult};
pub use resolver::{Applied, ConflictResolver, SyncStatus, DEFAULT_VALIDATION_TIMEOUT};
pub use select::{select_log, LogChoice};
