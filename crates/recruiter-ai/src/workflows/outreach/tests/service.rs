use std::sync::Arc;

use serde_json::json;

use super::common::{
    build_service, hook_url, john_doe, public_resolver, python_developer_job, webhook_config,
    MemoryRepository, RecordingTransport, UnavailableRepository, UnreachableTransport,
};
use crate::config::WebhookConfig;
use crate::workflows::outreach::domain::{AutomationTool, CallOutcome, CandidateId, NewCandidate};
use crate::workflows::outreach::safety::WebhookUrlPolicy;
use crate::workflows::outreach::service::{BatchRequest, OutreachService};

fn batch(candidate_ids: Vec<CandidateId>) -> BatchRequest {
    BatchRequest {
        candidate_ids,
        job: python_developer_job(),
        tool: AutomationTool::N8n,
        custom_script: None,
        custom_webhook: None,
    }
}

#[tokio::test]
async fn successful_dispatch_is_logged_as_sent() {
    let transport = RecordingTransport::ok(200, r#"{"queued":true}"#);
    let probe = transport.clone();
    let (service, repository) = build_service(transport, webhook_config(hook_url()));
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    let outcomes = service.trigger_batch(batch(vec![record.profile.id])).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].candidate_id, record.profile.id);
    assert_eq!(outcomes[0].status, CallOutcome::Sent);
    assert_eq!(outcomes[0].response, Some(json!({"queued": true})));
    assert!(outcomes[0].error.is_none());

    let logs = repository.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].outcome, CallOutcome::Sent);
    assert_eq!(logs[0].tool, "n8n");
    assert!(logs[0].script.contains("John Doe"));

    let requests = probe.requests();
    assert_eq!(requests.len(), 1);
    let (_, body) = &requests[0];
    assert_eq!(body["candidate"]["name"], "John Doe");
    assert_eq!(body["candidate"]["phone"], "+91-9876543210");
    assert!(body["script"]
        .as_str()
        .expect("script rendered")
        .contains("Python Developer"));
    assert_eq!(body["source"], "recruiter-ai");
}

#[tokio::test]
async fn missing_candidate_is_skipped_without_aborting_the_batch() {
    let transport = RecordingTransport::ok(200, "");
    let (service, repository) = build_service(transport, webhook_config(hook_url()));
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    let outcomes = service
        .trigger_batch(batch(vec![CandidateId(9999), record.profile.id]))
        .await;

    assert_eq!(outcomes.len(), 1, "missing id yields no outcome entry");
    assert_eq!(outcomes[0].candidate_id, record.profile.id);
    assert_eq!(outcomes[0].status, CallOutcome::Sent);
    assert_eq!(repository.logs().len(), 1);
}

#[tokio::test]
async fn unsafe_custom_webhook_fails_without_network_io() {
    let (service, repository) =
        build_service(UnreachableTransport, webhook_config(hook_url()));
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    let request = BatchRequest {
        candidate_ids: vec![record.profile.id],
        job: python_developer_job(),
        tool: AutomationTool::Custom,
        custom_script: None,
        custom_webhook: Some("http://127.0.0.1:9000/hook".to_string()),
    };
    let outcomes = service.trigger_batch(request).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, CallOutcome::Failed);
    let reason = outcomes[0].error.as_deref().expect("validation reason");
    assert!(reason.contains("loopback"), "got: {reason}");

    let logs = repository.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].outcome, CallOutcome::Failed);
}

#[tokio::test]
async fn unconfigured_tool_reports_configuration_error() {
    let config = WebhookConfig {
        n8n_url: None,
        ..webhook_config(hook_url())
    };
    let (service, repository) = build_service(UnreachableTransport, config);
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    let outcomes = service.trigger_batch(batch(vec![record.profile.id])).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, CallOutcome::Failed);
    assert!(outcomes[0]
        .error
        .as_deref()
        .expect("config error")
        .contains("no webhook URL configured"));
    assert_eq!(repository.logs().len(), 1);
}

#[tokio::test]
async fn custom_tool_without_url_reports_configuration_error() {
    let (service, _) = build_service(UnreachableTransport, webhook_config(hook_url()));
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    let request = BatchRequest {
        candidate_ids: vec![record.profile.id],
        job: python_developer_job(),
        tool: AutomationTool::Custom,
        custom_script: None,
        custom_webhook: None,
    };
    let outcomes = service.trigger_batch(request).await;

    assert_eq!(outcomes[0].status, CallOutcome::Failed);
    assert!(outcomes[0]
        .error
        .as_deref()
        .expect("config error")
        .contains("custom tool"));
}

#[tokio::test]
async fn non_2xx_reply_marks_candidate_failed_and_batch_continues() {
    let transport = RecordingTransport::with_replies(vec![
        Ok(crate::workflows::outreach::dispatch::TransportReply {
            status: 500,
            body: "boom".to_string(),
        }),
        Ok(crate::workflows::outreach::dispatch::TransportReply {
            status: 200,
            body: String::new(),
        }),
    ]);
    let (service, repository) = build_service(transport, webhook_config(hook_url()));
    let first = service.add_candidate(john_doe()).expect("seed candidate");
    let second = service
        .add_candidate(NewCandidate {
            name: "Asha Verma".to_string(),
            ..john_doe()
        })
        .expect("seed candidate");

    let outcomes = service
        .trigger_batch(batch(vec![first.profile.id, second.profile.id]))
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].status, CallOutcome::Failed);
    assert!(outcomes[0]
        .error
        .as_deref()
        .expect("failure detail")
        .contains("500"));
    assert_eq!(outcomes[1].status, CallOutcome::Sent);

    let logs = repository.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].outcome, CallOutcome::Failed);
    assert_eq!(logs[1].outcome, CallOutcome::Sent);
}

#[tokio::test]
async fn repository_outage_becomes_error_outcomes() {
    let repository = Arc::new(UnavailableRepository);
    let policy = WebhookUrlPolicy::with_resolver(false, public_resolver());
    let service = OutreachService::with_policy(
        repository,
        policy,
        UnreachableTransport,
        webhook_config(hook_url()),
    );

    let outcomes = service.trigger_batch(batch(vec![CandidateId(1)])).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, CallOutcome::Error);
    assert!(outcomes[0]
        .error
        .as_deref()
        .expect("outage detail")
        .contains("unavailable"));
}

#[tokio::test]
async fn configured_secret_rides_along_in_the_payload() {
    let transport = RecordingTransport::ok(200, "");
    let probe = transport.clone();
    let config = WebhookConfig {
        shared_secret: Some("s3cret".to_string()),
        ..webhook_config(hook_url())
    };
    let (service, _) = build_service(transport, config);
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    service.trigger_batch(batch(vec![record.profile.id])).await;

    let requests = probe.requests();
    assert_eq!(requests[0].1["secret"], "s3cret");
}

#[tokio::test]
async fn custom_script_overrides_the_default_template() {
    let transport = RecordingTransport::ok(200, "");
    let probe = transport.clone();
    let (service, _) = build_service(transport, webhook_config(hook_url()));
    let record = service.add_candidate(john_doe()).expect("seed candidate");

    let request = BatchRequest {
        custom_script: Some("Hi {candidate_name}, quick chat about {job_role}?".to_string()),
        ..batch(vec![record.profile.id])
    };
    service.trigger_batch(request).await;

    let requests = probe.requests();
    assert_eq!(
        requests[0].1["script"],
        "Hi John Doe, quick chat about Python Developer?"
    );
}
