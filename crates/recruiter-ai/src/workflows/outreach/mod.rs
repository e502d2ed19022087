//! Outbound candidate-outreach pipeline: URL safety validation, call-script
//! rendering, webhook dispatch, contact-state tracking, and reconciliation of
//! asynchronous results reported back by the automation platforms.
//!
//! The module is deliberately storage-agnostic: everything goes through the
//! [`CandidateRepository`] trait so the workflow can be exercised against an
//! in-memory double as easily as a real database.

pub mod dispatch;
pub mod domain;
pub mod repository;
pub mod router;
pub mod safety;
pub mod script;
pub mod service;

#[cfg(test)]
mod tests;

pub use dispatch::{
    DispatchError, DispatchSuccess, HttpTransport, TransportError, TransportReply,
    WebhookDispatcher, WebhookTarget, WebhookTransport, DISPATCH_TIMEOUT,
};
pub use domain::{
    AutomationTool, CallLogEntry, CallOutcome, CallbackNotice, CandidateId, CandidateProfile,
    CandidateRecord, ContactStatus, JobContext, NewCandidate, StatusUpdate,
};
pub use repository::{CallListFilter, CandidateRepository, RepositoryError};
pub use router::outreach_router;
pub use safety::{HostResolver, SystemResolver, UnsafeUrl, WebhookUrlPolicy, RESOLVE_TIMEOUT};
pub use script::{format_call_script, WebhookPayload, DEFAULT_CALL_SCRIPT, PAYLOAD_SOURCE};
pub use service::{
    BatchRequest, CallbackError, CallbackReceipt, CandidateDispatchOutcome, OutreachService,
    TargetSelectionError,
};
