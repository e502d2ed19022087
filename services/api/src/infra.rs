use metrics_exporter_prometheus::PrometheusHandle;
use recruiter_ai::workflows::outreach::{
    CallLogEntry, CallListFilter, CandidateId, CandidateProfile, CandidateRecord,
    CandidateRepository, ContactStatus, NewCandidate, RepositoryError, StatusUpdate,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Candidate store backing the service until a database is wired in. Ids are
/// handed out sequentially; the call ledger is append-only.
#[derive(Default)]
pub(crate) struct InMemoryCandidateRepository {
    next_id: AtomicI64,
    records: Mutex<HashMap<CandidateId, CandidateRecord>>,
    call_logs: Mutex<Vec<CallLogEntry>>,
}

impl CandidateRepository for InMemoryCandidateRepository {
    fn insert_candidate(&self, candidate: NewCandidate) -> Result<CandidateRecord, RepositoryError> {
        let id = CandidateId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = CandidateRecord {
            profile: CandidateProfile {
                id,
                name: candidate.name,
                email: candidate.email,
                phone: candidate.phone,
                current_location: candidate.current_location,
                experience_years: candidate.experience_years,
                current_company: candidate.current_company,
                current_designation: candidate.current_designation,
                skills: candidate.skills,
            },
            status: ContactStatus::default(),
        };
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(id, record.clone());
        Ok(record)
    }

    fn get_candidate(&self, id: CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update_candidate_status(
        &self,
        id: CandidateId,
        update: &StatusUpdate,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        update.apply_to(&mut record.status);
        Ok(())
    }

    fn append_call_log(&self, entry: CallLogEntry) -> Result<(), RepositoryError> {
        let mut guard = self.call_logs.lock().expect("ledger mutex poisoned");
        guard.push(entry);
        Ok(())
    }

    fn call_history(&self, id: CandidateId) -> Result<Vec<CallLogEntry>, RepositoryError> {
        let guard = self.call_logs.lock().expect("ledger mutex poisoned");
        let mut entries: Vec<CallLogEntry> = guard
            .iter()
            .filter(|entry| entry.candidate_id == id)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }

    fn candidates_for_calling(
        &self,
        filter: CallListFilter,
    ) -> Result<Vec<CandidateId>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut ids: Vec<CandidateId> = guard
            .values()
            .filter(|record| record.status.contacted == filter.contacted)
            .filter(|record| !filter.interested_only || record.status.interested == Some(true))
            .map(|record| record.profile.id)
            .collect();
        ids.sort_by_key(|id| id.0);
        Ok(ids)
    }
}
