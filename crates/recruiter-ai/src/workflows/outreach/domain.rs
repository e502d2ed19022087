use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for candidate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub i64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contact fields captured by the (external) ingestion step. The outreach
/// workflow only ever reads these; it never rewrites identity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: CandidateId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_location: Option<String>,
    pub experience_years: Option<f32>,
    pub current_company: Option<String>,
    pub current_designation: Option<String>,
    pub skills: Option<String>,
}

/// Contact fields for a candidate that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub experience_years: Option<f32>,
    #[serde(default)]
    pub current_company: Option<String>,
    #[serde(default)]
    pub current_designation: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
}

/// The candidate's outreach status. The three axes (contacted, interest,
/// interview) are independent; any combination is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactStatus {
    pub contacted: bool,
    pub interested: Option<bool>,
    pub interview_scheduled: bool,
    pub interview_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

/// A stored candidate: immutable contact fields plus the mutable status axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub profile: CandidateProfile,
    pub status: ContactStatus,
}

/// Partial status overwrite. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub contacted: Option<bool>,
    #[serde(default)]
    pub interested: Option<bool>,
    #[serde(default)]
    pub interview_scheduled: Option<bool>,
    #[serde(default)]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl StatusUpdate {
    pub fn apply_to(&self, status: &mut ContactStatus) {
        if let Some(contacted) = self.contacted {
            status.contacted = contacted;
        }
        if let Some(interested) = self.interested {
            status.interested = Some(interested);
        }
        if let Some(scheduled) = self.interview_scheduled {
            status.interview_scheduled = scheduled;
        }
        if let Some(date) = self.interview_date {
            status.interview_date = Some(date);
        }
        if let Some(comments) = &self.comments {
            status.comments = Some(comments.clone());
        }
    }
}

/// Terminal classification of a single dispatch or callback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Sent,
    Failed,
    Completed,
    Error,
}

impl CallOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            CallOutcome::Sent => "sent",
            CallOutcome::Failed => "failed",
            CallOutcome::Completed => "completed",
            CallOutcome::Error => "error",
        }
    }

    /// Maps the free-text status an automation platform reports back into the
    /// ledger vocabulary. Absent or unrecognized statuses count as completed.
    pub fn from_reported(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("sent") => CallOutcome::Sent,
            Some(value) if value.eq_ignore_ascii_case("failed") => CallOutcome::Failed,
            Some(value) if value.eq_ignore_ascii_case("error") => CallOutcome::Error,
            _ => CallOutcome::Completed,
        }
    }
}

/// Append-only audit record of one dispatch or callback event. A new event
/// always creates a new entry; entries are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    pub candidate_id: CandidateId,
    pub script: String,
    pub outcome: CallOutcome,
    pub tool: String,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// The automation platform presets plus an escape hatch for arbitrary URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationTool {
    #[default]
    N8n,
    Make,
    Custom,
}

impl AutomationTool {
    pub const fn label(self) -> &'static str {
        match self {
            AutomationTool::N8n => "n8n",
            AutomationTool::Make => "make",
            AutomationTool::Custom => "custom",
        }
    }
}

/// Job opening details substituted into call scripts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobContext {
    #[serde(default)]
    pub job_role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Asynchronous result posted back by an automation platform after it has
/// placed the call or sent the message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallbackNotice {
    pub candidate_id: CandidateId,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub interested: Option<bool>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub ai_tool: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}
