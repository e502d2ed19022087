use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::WebhookConfig;
use crate::workflows::outreach::dispatch::{TransportError, TransportReply, WebhookTransport};
use crate::workflows::outreach::domain::{
    CallLogEntry, CandidateId, CandidateProfile, CandidateRecord, ContactStatus, JobContext,
    NewCandidate, StatusUpdate,
};
use crate::workflows::outreach::repository::{
    CallListFilter, CandidateRepository, RepositoryError,
};
use crate::workflows::outreach::safety::{HostResolver, WebhookUrlPolicy};
use crate::workflows::outreach::service::OutreachService;

pub(super) fn john_doe() -> NewCandidate {
    NewCandidate {
        name: "John Doe".to_string(),
        email: Some("john.doe@example.com".to_string()),
        phone: Some("+91-9876543210".to_string()),
        current_location: Some("Bangalore".to_string()),
        experience_years: Some(3.5),
        current_company: Some("Acme Systems".to_string()),
        current_designation: Some("Software Engineer".to_string()),
        skills: Some("Python, Django, SQL".to_string()),
    }
}

pub(super) fn python_developer_job() -> JobContext {
    JobContext {
        job_role: Some("Python Developer".to_string()),
        location: Some("Bangalore".to_string()),
        company_name: Some("Tech Corp".to_string()),
    }
}

pub(super) fn webhook_config(n8n_url: &str) -> WebhookConfig {
    WebhookConfig {
        n8n_url: Some(n8n_url.to_string()),
        make_url: None,
        shared_secret: None,
        allow_local: false,
    }
}

pub(super) fn hook_url() -> &'static str {
    "https://hooks.example-automation.com/abc"
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    next_id: AtomicI64,
    records: Mutex<HashMap<CandidateId, CandidateRecord>>,
    call_logs: Mutex<Vec<CallLogEntry>>,
}

impl MemoryRepository {
    pub(super) fn logs(&self) -> Vec<CallLogEntry> {
        self.call_logs.lock().expect("ledger mutex poisoned").clone()
    }

    pub(super) fn record(&self, id: CandidateId) -> Option<CandidateRecord> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&id)
            .cloned()
    }
}

impl CandidateRepository for MemoryRepository {
    fn insert_candidate(
        &self,
        candidate: NewCandidate,
    ) -> Result<CandidateRecord, RepositoryError> {
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
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(id, record.clone());
        Ok(record)
    }

    fn get_candidate(&self, id: CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .get(&id)
            .cloned())
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
        self.call_logs
            .lock()
            .expect("ledger mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn call_history(&self, id: CandidateId) -> Result<Vec<CallLogEntry>, RepositoryError> {
        let mut entries: Vec<CallLogEntry> = self
            .call_logs
            .lock()
            .expect("ledger mutex poisoned")
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

/// Repository double that fails every operation, mirroring a database outage.
pub(super) struct UnavailableRepository;

impl CandidateRepository for UnavailableRepository {
    fn insert_candidate(&self, _: NewCandidate) -> Result<CandidateRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn get_candidate(&self, _: CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_candidate_status(
        &self,
        _: CandidateId,
        _: &StatusUpdate,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn append_call_log(&self, _: CallLogEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn call_history(&self, _: CandidateId) -> Result<Vec<CallLogEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn candidates_for_calling(
        &self,
        _: CallListFilter,
    ) -> Result<Vec<CandidateId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Transport double that records every request and pops canned replies. Once
/// the queue is empty it answers 200 with an empty body. Clones share state
/// so tests can keep a probe handle after moving the transport in.
#[derive(Default, Clone)]
pub(super) struct RecordingTransport {
    replies: Arc<Mutex<VecDeque<Result<TransportReply, TransportError>>>>,
    requests: Arc<Mutex<Vec<(Url, Value)>>>,
}

impl RecordingTransport {
    pub(super) fn with_replies(
        replies: Vec<Result<TransportReply, TransportError>>,
    ) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(super) fn ok(status: u16, body: &str) -> Self {
        Self::with_replies(vec![Ok(TransportReply {
            status,
            body: body.to_string(),
        })])
    }

    pub(super) fn requests(&self) -> Vec<(Url, Value)> {
        self.requests.lock().expect("request mutex poisoned").clone()
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<TransportReply, TransportError> {
        self.requests
            .lock()
            .expect("request mutex poisoned")
            .push((url.clone(), body.clone()));
        self.replies
            .lock()
            .expect("reply mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TransportReply {
                    status: 200,
                    body: String::new(),
                })
            })
    }
}

/// Transport double for paths where no network I/O may happen at all.
pub(super) struct UnreachableTransport;

#[async_trait]
impl WebhookTransport for UnreachableTransport {
    async fn post_json(&self, url: &Url, _: &Value) -> Result<TransportReply, TransportError> {
        unreachable!("transport must not be contacted for {url}")
    }
}

/// Resolver double returning fixed addresses for every hostname.
pub(super) struct StaticResolver(pub(super) Vec<IpAddr>);

impl HostResolver for StaticResolver {
    fn resolve(&self, _: &str) -> std::io::Result<Vec<IpAddr>> {
        Ok(self.0.clone())
    }
}

/// Resolver double simulating NXDOMAIN for every hostname.
pub(super) struct FailingResolver;

impl HostResolver for FailingResolver {
    fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such host: {host}"),
        ))
    }
}

pub(super) fn public_resolver() -> Box<StaticResolver> {
    Box::new(StaticResolver(vec![IpAddr::from([93, 184, 216, 34])]))
}

pub(super) fn build_service<T>(
    transport: T,
    webhooks: WebhookConfig,
) -> (
    OutreachService<MemoryRepository, T>,
    Arc<MemoryRepository>,
)
where
    T: WebhookTransport + 'static,
{
    let repository = Arc::new(MemoryRepository::default());
    let policy = WebhookUrlPolicy::with_resolver(webhooks.allow_local, public_resolver());
    let service = OutreachService::with_policy(repository.clone(), policy, transport, webhooks);
    (service, repository)
}
