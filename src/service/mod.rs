//! Document Service: one operation per document type.
//!
//! Each `issue_*` call runs validate → render → sign:
//!
//! - blocking validation errors stop the call with
//!   [`IssueFailure::Rejected`] and nothing is rendered;
//! - rendering and signing run on a bounded worker pool, each job limited
//!   by [`EngineConfig::operation_timeout`](crate::config::EngineConfig::operation_timeout);
//! - when signing fails, the unsigned PDF comes back in
//!   [`IssueFailure::Failed`] exactly as the renderer produced it.
//!
//! Non-blocking findings (a discarded stale signature, a doctor name that
//! differs from the certificate holder) are returned as notices.

mod document_service;
mod pool;
mod request;

pub use document_service::{DocumentService, IssueResult};
pub use pool::WorkerPool;
pub use request::{DocumentOutcome, IssueFailure, SigningRequest};
