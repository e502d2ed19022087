use super::domain::{CallLogEntry, CandidateId, CandidateRecord, NewCandidate, StatusUpdate};

/// Storage abstraction so the outreach workflow never touches a concrete
/// database. Each method is assumed to be independently atomic at the storage
/// layer; the workflow does not coordinate cross-candidate ordering.
pub trait CandidateRepository: Send + Sync {
    fn insert_candidate(&self, candidate: NewCandidate)
        -> Result<CandidateRecord, RepositoryError>;
    fn get_candidate(&self, id: CandidateId) -> Result<Option<CandidateRecord>, RepositoryError>;
    fn update_candidate_status(
        &self,
        id: CandidateId,
        update: &StatusUpdate,
    ) -> Result<(), RepositoryError>;
    /// Appends to the call ledger. Entries are immutable once written.
    fn append_call_log(&self, entry: CallLogEntry) -> Result<(), RepositoryError>;
    /// All ledger entries for a candidate, newest first.
    fn call_history(&self, id: CandidateId) -> Result<Vec<CallLogEntry>, RepositoryError>;
    fn candidates_for_calling(
        &self,
        filter: CallListFilter,
    ) -> Result<Vec<CandidateId>, RepositoryError>;
}

/// Selection criteria for building a call list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallListFilter {
    /// When true, select already-contacted candidates; otherwise fresh ones.
    pub contacted: bool,
    pub interested_only: bool,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("candidate not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
