//! End-to-end tests of the orchestrator over the standard pipeline.

use super::*;
use crate::context::AnalysisContext;
use crate::stages::standard_pipeline;
use crate::store::TemplateStore;
use crate::testing::{FailingGenerator, MockGenerator};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn pipeline_with(generator: Arc<MockGenerator>) -> AnalysisPipeline {
    standard_pipeline(
        generator,
        Arc::new(TemplateStore::new()),
        Arc::new(TemplateStore::new()),
    )
    .unwrap()
}

/// A default response every stage can parse into one record.
const PARSEABLE: &str = "Clause: payment due in a reasonable time\n\
                        Risk: ambiguous deadline\n\
                        Name: Acme Corp\n\
                        Type: corporation\n";

#[tokio::test]
async fn test_full_run_reports_every_stage() {
    let generator = Arc::new(MockGenerator::with_default_response(PARSEABLE));
    let pipeline = pipeline_with(generator);

    let result = pipeline.run("contract text", None).await.unwrap();

    // risky_clauses is non-empty, so the suggestion gate opens
    assert_eq!(
        result.stages(),
        &[
            "review",
            "risk",
            "clause",
            "suggestion",
            "inconsistency",
            "compliance",
            "summary"
        ]
    );
    assert!(result.duration_ms >= 0.0);
}

#[tokio::test]
async fn test_gate_skips_suggestion_without_risk_findings() {
    // Responses without separators parse to zero records, so the risk stage
    // reports an empty risky_clauses list.
    let generator = Arc::new(MockGenerator::with_default_response("nothing to report"));
    let pipeline = pipeline_with(generator);

    let result = pipeline.run("contract text", None).await.unwrap();

    assert!(!result.contains("suggestion"));
    assert_eq!(
        result.stages(),
        &["review", "risk", "clause", "inconsistency", "compliance", "summary"]
    );
}

#[tokio::test]
async fn test_context_accumulates_across_stages() {
    let generator = Arc::new(MockGenerator::with_default_response(PARSEABLE));
    let pipeline = pipeline_with(generator);

    let result = pipeline.run("contract text", None).await.unwrap();

    // Every stage's keys are present in its recorded result
    for (stage, key) in [
        ("review", "parties"),
        ("risk", "risky_clauses"),
        ("clause", "comparisons"),
        ("suggestion", "alternatives"),
        ("inconsistency", "impact_analysis"),
        ("compliance", "compliance_report"),
        ("summary", "executive_summary"),
    ] {
        assert!(
            result.get(stage).unwrap().get(key).is_some(),
            "{stage} missing {key}"
        );
    }
}

#[tokio::test]
async fn test_initial_context_is_visible_to_stages() {
    let generator = Arc::new(MockGenerator::with_default_response(PARSEABLE));
    let pipeline = pipeline_with(generator.clone());

    let mut initial = AnalysisContext::new();
    initial.insert("matter_number", serde_json::json!("M-2024-017"));
    pipeline.run("contract text", Some(initial)).await.unwrap();

    // The summary stage serializes the accumulated context into its prompts
    let prompts = generator.recorded_prompts();
    assert!(prompts.iter().any(|p| p.contains("M-2024-017")));
}

#[tokio::test]
async fn test_failure_contains_partial_results() {
    let generator = Arc::new(MockGenerator::with_default_response("no findings"));
    // review issues 3 calls; the 4th (risk identification) fails
    generator.fail_after(3, "service unavailable");
    let pipeline = pipeline_with(generator);

    let failure = pipeline.run("contract text", None).await.unwrap_err();

    assert_eq!(failure.stage, "risk");
    assert!(matches!(
        failure.cause,
        crate::errors::AnalysisError::Generation { ref stage, .. } if stage == "risk"
    ));
    // Only the review stage completed before the failure
    assert_eq!(failure.partial.stages(), &["review"]);
    assert!(failure.partial.get("risk").is_none());
}

#[tokio::test]
async fn test_failure_on_first_stage_leaves_empty_partial() {
    let pipeline = standard_pipeline(
        Arc::new(FailingGenerator::new("offline")),
        Arc::new(TemplateStore::new()),
        Arc::new(TemplateStore::new()),
    )
    .unwrap();

    let failure = pipeline.run("contract text", None).await.unwrap_err();
    assert_eq!(failure.stage, "review");
    assert!(failure.partial.is_empty());
}

#[tokio::test]
async fn test_run_one_unknown_stage() {
    let generator = Arc::new(MockGenerator::new());
    let pipeline = pipeline_with(generator.clone());

    let err = pipeline
        .run_one("unknown_stage", "text", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        crate::errors::AnalysisError::UnknownStage(ref id) if id == "unknown_stage"
    ));
    // No generation call was made
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_run_one_bypasses_gates() {
    let generator = Arc::new(MockGenerator::new());
    let pipeline = pipeline_with(generator);

    // The suggestion gate would skip this in a full run; run_one instead
    // reaches the stage, which reports its missing input.
    let result = pipeline
        .run_one("suggestion", "text", None)
        .await
        .unwrap();

    assert!(!result.is_complete());
    assert_eq!(result.missing_key(), Some("risky_clauses"));
}

#[tokio::test]
async fn test_run_one_uses_supplied_context() {
    let generator = Arc::new(MockGenerator::with_default_response(
        "Alternative: fixed 30-day deadline\n",
    ));
    let pipeline = pipeline_with(generator);

    let mut ctx = AnalysisContext::new();
    ctx.insert("risky_clauses", serde_json::json!([{"clause": "x", "risk": "vague"}]));

    let result = pipeline
        .run_one("suggestion", "text", Some(&ctx))
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.get("alternatives").unwrap().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_pre_cancelled_token_aborts_before_any_stage() {
    let generator = Arc::new(MockGenerator::new());
    let pipeline = pipeline_with(generator.clone());

    let token = crate::cancel::CancelToken::new();
    token.cancel("caller gave up");

    let failure = pipeline
        .run_with_token("contract text", None, &token)
        .await
        .unwrap_err();

    assert!(failure.cause.is_cancelled());
    assert!(failure.partial.is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_mid_run_cancellation_aborts_in_flight_stage() {
    let generator = Arc::new(MockGenerator::with_default_response(PARSEABLE));
    generator.set_delay(Duration::from_millis(50));
    let pipeline = Arc::new(pipeline_with(generator));

    let token = Arc::new(crate::cancel::CancelToken::new());
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel("deadline reached");
    });

    let failure = pipeline
        .run_with_token("contract text", None, &token)
        .await
        .unwrap_err();

    assert!(failure.cause.is_cancelled());
    // The first stage was in flight; nothing of it was merged or recorded
    assert_eq!(failure.stage, "review");
    assert!(failure.partial.is_empty());
}

#[tokio::test]
async fn test_run_with_timeout_expires() {
    let generator = Arc::new(MockGenerator::with_default_response(PARSEABLE));
    generator.set_delay(Duration::from_millis(100));
    let pipeline = pipeline_with(generator);

    let failure = pipeline
        .run_with_timeout("contract text", None, Duration::from_millis(20))
        .await
        .unwrap_err();

    assert!(failure.cause.is_cancelled());
    assert!(failure.cause.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_run_with_timeout_completes_under_deadline() {
    let generator = Arc::new(MockGenerator::with_default_response("no findings"));
    let pipeline = pipeline_with(generator);

    let result = pipeline
        .run_with_timeout("contract text", None, Duration::from_secs(30))
        .await
        .unwrap();

    assert!(result.contains("summary"));
}

#[tokio::test]
async fn test_determinism_of_stage_order_and_keys() {
    let make = || async {
        let generator = Arc::new(MockGenerator::with_default_response(PARSEABLE));
        let pipeline = pipeline_with(generator);
        pipeline.run("contract text", None).await.unwrap()
    };

    let first = make().await;
    let second = make().await;

    assert_eq!(first.stages(), second.stages());
    for stage in first.stages() {
        let mut first_keys: Vec<&String> = first.get(stage).unwrap().data().keys().collect();
        let mut second_keys: Vec<&String> = second.get(stage).unwrap().data().keys().collect();
        first_keys.sort();
        second_keys.sort();
        assert_eq!(first_keys, second_keys, "key set differs for {stage}");
    }
}
