use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::domain::{CandidateProfile, JobContext};

/// Tag stamped into every outbound payload so receiving workflows can tell
/// where a request originated.
pub const PAYLOAD_SOURCE: &str = "recruiter-ai";

/// Template used when a batch does not supply its own script.
pub const DEFAULT_CALL_SCRIPT: &str = "\
Hello {candidate_name},

This is regarding the {job_role} position at {company_name}.
We came across your profile and would like to discuss this opportunity with you.

Are you interested in exploring this opportunity?
";

/// Renders the call script for one candidate, substituting the recognized
/// placeholders and falling back to neutral defaults for absent fields.
///
/// A template that references an unknown placeholder is returned verbatim;
/// the automation platform still receives a usable (if unrendered) script,
/// and the mistake is logged rather than failing the batch.
pub fn format_call_script(
    candidate: &CandidateProfile,
    job: &JobContext,
    template: Option<&str>,
) -> String {
    let template = template.unwrap_or(DEFAULT_CALL_SCRIPT);

    let experience = candidate
        .experience_years
        .map(|years| years.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let substitutions: [(&str, &str); 5] = [
        ("candidate_name", candidate.name.as_str()),
        ("job_role", job.job_role.as_deref().unwrap_or("a position")),
        ("experience_years", experience.as_str()),
        ("location", job.location.as_deref().unwrap_or("our office")),
        (
            "company_name",
            job.company_name.as_deref().unwrap_or("our company"),
        ),
    ];

    match render_template(template, &substitutions) {
        Some(script) => script,
        None => {
            warn!("call script template references an unknown placeholder; using it verbatim");
            template.to_string()
        }
    }
}

/// `{name}`-style substitution. Doubled braces escape a literal brace.
/// Returns `None` when the template names a placeholder that is not in
/// `substitutions` or when a brace is left unclosed.
fn render_template(template: &str, substitutions: &[(&str, &str)]) -> Option<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) => key.push(inner),
                        None => return None,
                    }
                }
                let value = substitutions
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| *value)?;
                rendered.push_str(value);
            }
            '}' => return None,
            other => rendered.push(other),
        }
    }

    Some(rendered)
}

/// JSON body POSTed to an automation platform.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub candidate: CandidateProfile,
    pub script: String,
    pub timestamp: DateTime<Utc>,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl WebhookPayload {
    pub fn new(candidate: CandidateProfile, script: String, secret: Option<String>) -> Self {
        Self {
            candidate,
            script,
            timestamp: Utc::now(),
            source: PAYLOAD_SOURCE,
            secret,
        }
    }
}
