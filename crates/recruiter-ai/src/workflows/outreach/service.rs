use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use url::Url;

use crate::config::WebhookConfig;

use super::dispatch::{DispatchError, WebhookDispatcher, WebhookTarget, WebhookTransport};
use super::domain::{
    AutomationTool, CallLogEntry, CallOutcome, CallbackNotice, CandidateId, CandidateRecord,
    JobContext, NewCandidate, StatusUpdate,
};
use super::repository::{CallListFilter, CandidateRepository, RepositoryError};
use super::safety::WebhookUrlPolicy;
use super::script::{format_call_script, WebhookPayload};

/// One batch trigger: which candidates to contact, the job being pitched, and
/// where to send the payloads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchRequest {
    pub candidate_ids: Vec<CandidateId>,
    #[serde(default, rename = "job_data")]
    pub job: JobContext,
    #[serde(default, rename = "ai_tool")]
    pub tool: AutomationTool,
    #[serde(default)]
    pub custom_script: Option<String>,
    #[serde(default)]
    pub custom_webhook: Option<String>,
}

/// Per-candidate outcome of a batch. The list never aborts early; one entry
/// per candidate that existed, nothing for ids that were skipped as missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateDispatchOutcome {
    pub candidate_id: CandidateId,
    pub status: CallOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Acknowledgement returned to the automation platform for a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallbackReceipt {
    pub candidate_id: CandidateId,
}

/// Callback rejections. On any of these no candidate state is mutated and no
/// ledger entry is written.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("invalid webhook secret")]
    Unauthorized,
    #[error("candidate {0} not found")]
    UnknownCandidate(CandidateId),
    #[error(transparent)]
    Repository(RepositoryError),
}

/// Reasons a destination could not even be selected. Distinct from URL safety
/// rejections: these never reach the validator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TargetSelectionError {
    #[error("no webhook URL configured for tool '{0}'")]
    MissingUrl(&'static str),
    #[error("custom tool selected without a webhook URL")]
    MissingCustomUrl,
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Composes the formatter, dispatcher, and contact-state tracking over an
/// injected repository. One instance per process; webhook configuration is
/// fixed at construction.
pub struct OutreachService<R, T> {
    repository: Arc<R>,
    dispatcher: WebhookDispatcher<T>,
    webhooks: WebhookConfig,
}

impl<R, T> OutreachService<R, T>
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    pub fn new(repository: Arc<R>, transport: T, webhooks: WebhookConfig) -> Self {
        let policy = WebhookUrlPolicy::new(webhooks.allow_local);
        Self::with_policy(repository, policy, transport, webhooks)
    }

    /// Constructor for tests that need to inject a canned DNS resolver.
    pub fn with_policy(
        repository: Arc<R>,
        policy: WebhookUrlPolicy,
        transport: T,
        webhooks: WebhookConfig,
    ) -> Self {
        Self {
            repository,
            dispatcher: WebhookDispatcher::new(policy, transport),
            webhooks,
        }
    }

    /// Dispatches the batch one candidate at a time. Failures are isolated:
    /// every error class becomes an outcome entry for that candidate and the
    /// loop moves on. Only missing candidates are skipped entirely.
    pub async fn trigger_batch(&self, request: BatchRequest) -> Vec<CandidateDispatchOutcome> {
        let target = self.select_target(request.tool, request.custom_webhook.as_deref());
        let mut outcomes = Vec::with_capacity(request.candidate_ids.len());

        for candidate_id in request.candidate_ids.iter().copied() {
            let record = match self.repository.get_candidate(candidate_id) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!(%candidate_id, "candidate not found; skipping");
                    continue;
                }
                Err(err) => {
                    error!(%candidate_id, error = %err, "candidate lookup failed");
                    outcomes.push(CandidateDispatchOutcome {
                        candidate_id,
                        status: CallOutcome::Error,
                        response: None,
                        error: Some(err.to_string()),
                    });
                    continue;
                }
            };

            let script =
                format_call_script(&record.profile, &request.job, request.custom_script.as_deref());

            let outcome = match &target {
                Ok(target) => {
                    self.dispatch_one(candidate_id, record, target, script)
                        .await
                }
                Err(err) => {
                    error!(%candidate_id, error = %err, "no usable webhook target");
                    self.record_failure(candidate_id, script, request.tool.label(), err.to_string())
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn dispatch_one(
        &self,
        candidate_id: CandidateId,
        record: CandidateRecord,
        target: &WebhookTarget,
        script: String,
    ) -> CandidateDispatchOutcome {
        let payload = WebhookPayload::new(
            record.profile,
            script.clone(),
            self.webhooks.shared_secret.clone(),
        );

        match self.dispatcher.dispatch(target, &payload).await {
            Ok(success) => {
                let entry = CallLogEntry {
                    candidate_id,
                    script,
                    outcome: CallOutcome::Sent,
                    tool: target.tool.clone(),
                    notes: Some(success.body.to_string()),
                    logged_at: Utc::now(),
                };
                if let Err(err) = self.repository.append_call_log(entry) {
                    error!(%candidate_id, error = %err, "failed to record call log");
                    return CandidateDispatchOutcome {
                        candidate_id,
                        status: CallOutcome::Error,
                        response: None,
                        error: Some(err.to_string()),
                    };
                }
                CandidateDispatchOutcome {
                    candidate_id,
                    status: CallOutcome::Sent,
                    response: Some(success.body),
                    error: None,
                }
            }
            Err(err) => {
                let detail = dispatch_error_detail(&err);
                self.record_failure(candidate_id, script, &target.tool, detail)
            }
        }
    }

    /// Writes a failed ledger entry and folds any ledger write error into the
    /// outcome so the batch keeps going.
    fn record_failure(
        &self,
        candidate_id: CandidateId,
        script: String,
        tool: &str,
        detail: String,
    ) -> CandidateDispatchOutcome {
        let entry = CallLogEntry {
            candidate_id,
            script,
            outcome: CallOutcome::Failed,
            tool: tool.to_string(),
            notes: Some(detail.clone()),
            logged_at: Utc::now(),
        };
        if let Err(err) = self.repository.append_call_log(entry) {
            error!(%candidate_id, error = %err, "failed to record call log");
            return CandidateDispatchOutcome {
                candidate_id,
                status: CallOutcome::Error,
                response: None,
                error: Some(err.to_string()),
            };
        }
        CandidateDispatchOutcome {
            candidate_id,
            status: CallOutcome::Failed,
            response: None,
            error: Some(detail),
        }
    }

    fn select_target(
        &self,
        tool: AutomationTool,
        custom: Option<&str>,
    ) -> Result<WebhookTarget, TargetSelectionError> {
        let raw = match tool {
            AutomationTool::N8n => self
                .webhooks
                .n8n_url
                .as_deref()
                .ok_or(TargetSelectionError::MissingUrl("n8n"))?,
            AutomationTool::Make => self
                .webhooks
                .make_url
                .as_deref()
                .ok_or(TargetSelectionError::MissingUrl("make"))?,
            AutomationTool::Custom => custom.ok_or(TargetSelectionError::MissingCustomUrl)?,
        };

        let url = Url::parse(raw)?;
        Ok(WebhookTarget {
            tool: tool.label().to_string(),
            url,
        })
    }

    /// Applies an asynchronous call result reported by the automation
    /// platform. Secret mismatch and unknown candidates are rejected before
    /// any write. A duplicate callback is applied again and logged again; the
    /// ledger keeps both entries.
    pub fn process_callback(
        &self,
        notice: CallbackNotice,
    ) -> Result<CallbackReceipt, CallbackError> {
        if let Some(expected) = self.webhooks.shared_secret.as_deref() {
            let presented = notice.secret.as_deref().unwrap_or_default();
            if !constant_time_eq(expected.as_bytes(), presented.as_bytes()) {
                return Err(CallbackError::Unauthorized);
            }
        }

        let update = StatusUpdate {
            contacted: Some(true),
            interested: notice.interested,
            comments: notice.response.clone(),
            ..StatusUpdate::default()
        };
        self.repository
            .update_candidate_status(notice.candidate_id, &update)
            .map_err(|err| match err {
                RepositoryError::NotFound => CallbackError::UnknownCandidate(notice.candidate_id),
                other => CallbackError::Repository(other),
            })?;

        let entry = CallLogEntry {
            candidate_id: notice.candidate_id,
            script: String::new(),
            outcome: CallOutcome::from_reported(notice.call_status.as_deref()),
            tool: notice.ai_tool.unwrap_or_else(|| "unknown".to_string()),
            notes: notice.response,
            logged_at: Utc::now(),
        };
        self.repository
            .append_call_log(entry)
            .map_err(CallbackError::Repository)?;

        Ok(CallbackReceipt {
            candidate_id: notice.candidate_id,
        })
    }

    /// Manual status edit. Unlike dispatch and callback paths this does not
    /// touch the call ledger.
    pub fn apply_status_update(
        &self,
        candidate_id: CandidateId,
        update: &StatusUpdate,
    ) -> Result<(), RepositoryError> {
        self.repository.update_candidate_status(candidate_id, update)
    }

    pub fn add_candidate(&self, candidate: NewCandidate) -> Result<CandidateRecord, RepositoryError> {
        self.repository.insert_candidate(candidate)
    }

    pub fn call_history(&self, candidate_id: CandidateId) -> Result<Vec<CallLogEntry>, RepositoryError> {
        match self.repository.get_candidate(candidate_id)? {
            Some(_) => self.repository.call_history(candidate_id),
            None => Err(RepositoryError::NotFound),
        }
    }

    pub fn candidates_for_calling(
        &self,
        filter: CallListFilter,
    ) -> Result<Vec<CandidateId>, RepositoryError> {
        self.repository.candidates_for_calling(filter)
    }
}

fn dispatch_error_detail(err: &DispatchError) -> String {
    match err {
        DispatchError::Http { status, body } if !body.trim().is_empty() => {
            format!("webhook returned HTTP {status}: {body}")
        }
        other => other.to_string(),
    }
}

/// Length-gated byte fold so the comparison cost does not depend on where the
/// first mismatching byte sits.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
