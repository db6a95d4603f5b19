//! Safer-alternative generation for risky clauses found upstream.

use super::{bucket_first, bucket_list, field};
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::{parse_records, KeywordRouter};
use crate::stage::{Stage, StageData, StageResult};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Rewrites risky clauses into safer alternatives.
///
/// Requires `risky_clauses` in the context; without it the stage reports a
/// missing-input result instead of calling the generation service. Under the
/// standard pipeline a gate skips this stage entirely when no risk findings
/// exist.
pub struct SuggestionStage {
    generator: Arc<dyn Generator>,
    rewrite_router: KeywordRouter,
    explain_router: KeywordRouter,
    guidance_router: KeywordRouter,
}

impl SuggestionStage {
    /// Stage identifier.
    pub const ID: &'static str = "suggestion";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            rewrite_router: KeywordRouter::new([
                ("alternative", "alternative_version"),
                ("change", "changes"),
                ("risk", "risk_addressed"),
                ("consideration", "considerations"),
            ]),
            explain_router: KeywordRouter::new([
                ("improvement", "improvements"),
                ("benefit", "legal_benefits"),
                ("enhancement", "enhancements"),
                ("consideration", "considerations"),
            ]),
            guidance_router: KeywordRouter::new([
                ("step", "steps"),
                ("related", "related_changes"),
                ("impact", "impacts"),
                ("review", "review_process"),
                ("documentation", "documentation"),
            ]),
        }
    }

    async fn rewrite(&self, clause: &serde_json::Value) -> Result<serde_json::Value, GenerationError> {
        let response = self.generator.generate(&rewrite_prompt(clause)).await?;
        let mut buckets = self.rewrite_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "original_clause": clause.clone(),
            "alternative_version": bucket_first(&mut buckets, "alternative_version"),
            "changes": bucket_list(&mut buckets, "changes"),
            "risk_addressed": bucket_first(&mut buckets, "risk_addressed"),
            "considerations": bucket_list(&mut buckets, "considerations"),
        }))
    }

    async fn explain(
        &self,
        alternative: &serde_json::Value,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self.generator.generate(&explain_prompt(alternative)).await?;
        let mut buckets = self.explain_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "alternative_version": alternative.get("alternative_version").cloned().unwrap_or_default(),
            "improvements": bucket_list(&mut buckets, "improvements"),
            "legal_benefits": bucket_list(&mut buckets, "legal_benefits"),
            "enhancements": bucket_list(&mut buckets, "enhancements"),
            "considerations": bucket_list(&mut buckets, "considerations"),
        }))
    }

    async fn guide(
        &self,
        alternative: &serde_json::Value,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self.generator.generate(&guidance_prompt(alternative)).await?;
        let mut buckets = self.guidance_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "alternative_version": alternative.get("alternative_version").cloned().unwrap_or_default(),
            "steps": bucket_list(&mut buckets, "steps"),
            "related_changes": bucket_list(&mut buckets, "related_changes"),
            "impacts": bucket_list(&mut buckets, "impacts"),
            "review_process": bucket_list(&mut buckets, "review_process"),
            "documentation": bucket_list(&mut buckets, "documentation"),
        }))
    }
}

impl std::fmt::Debug for SuggestionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionStage").finish()
    }
}

#[async_trait]
impl Stage for SuggestionStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        _document: &str,
        ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let Some(risky) = ctx.get_array("risky_clauses") else {
            return Ok(StageResult::missing_input("risky_clauses"));
        };

        let alternatives =
            try_join_all(risky.iter().map(|clause| self.rewrite(clause))).await?;

        let (explanations, guidance) = futures::try_join!(
            try_join_all(alternatives.iter().map(|alt| self.explain(alt))),
            try_join_all(alternatives.iter().map(|alt| self.guide(alt))),
        )?;

        let mut data = StageData::new();
        data.insert(
            "alternatives".to_string(),
            serde_json::Value::Array(alternatives),
        );
        data.insert(
            "explanations".to_string(),
            serde_json::Value::Array(explanations),
        );
        data.insert("guidance".to_string(), serde_json::Value::Array(guidance));
        Ok(StageResult::complete(data))
    }
}

fn rewrite_prompt(clause: &serde_json::Value) -> String {
    format!(
        "Rewrite this risky contract clause into a safer, clearer version. Use specific \
         language, balanced obligations, and legally enforceable wording.\n\n\
         Original clause: {}\n\
         Risk: {}\n\n\
         Answer in this form:\n\
         Alternative: <the rewritten clause>\n\
         Change 1: <a key change made>\n\
         Change 2: <the next change, and so on>\n\
         Risk addressed: <how the rewrite removes the risk>\n\
         Consideration: <anything else to weigh>",
        field(clause, "clause"),
        field(clause, "risk"),
    )
}

fn explain_prompt(alternative: &serde_json::Value) -> String {
    format!(
        "Explain the improvements in this clause revision.\n\n\
         Original clause: {}\n\
         Rewritten clause: {}\n\n\
         Answer in this form:\n\
         Improvement 1: <an improvement>\n\
         Improvement 2: <the next improvement, and so on>\n\
         Benefit: <a legal benefit of the changes>\n\
         Enhancement: <how clarity or enforceability improves>\n\
         Consideration: <a trade-off to keep in mind>",
        field(
            alternative.get("original_clause").unwrap_or(&serde_json::Value::Null),
            "clause"
        ),
        field(alternative, "alternative_version"),
    )
}

fn guidance_prompt(alternative: &serde_json::Value) -> String {
    format!(
        "Give implementation guidance for adopting this clause revision.\n\n\
         Original clause: {}\n\
         Rewritten clause: {}\n\n\
         Answer in this form:\n\
         Step 1: <an implementation step>\n\
         Step 2: <the next step, and so on>\n\
         Related: <required changes to related clauses>\n\
         Impact: <effect on other parts of the document>\n\
         Review: <recommended review and approval process>\n\
         Documentation: <additional documentation needed>",
        field(
            alternative.get("original_clause").unwrap_or(&serde_json::Value::Null),
            "clause"
        ),
        field(alternative, "alternative_version"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;
    use pretty_assertions::assert_eq;

    fn context_with_risks(n: usize) -> AnalysisContext {
        let clauses: Vec<serde_json::Value> = (0..n)
            .map(|i| serde_json::json!({"clause": format!("clause {i}"), "risk": "vague"}))
            .collect();
        let mut ctx = AnalysisContext::new();
        ctx.insert("risky_clauses", serde_json::Value::Array(clauses));
        ctx
    }

    #[tokio::test]
    async fn test_missing_input_without_risky_clauses() {
        let generator = Arc::new(MockGenerator::new());
        let stage = SuggestionStage::new(generator.clone());

        let result = stage
            .process("document", &AnalysisContext::new())
            .await
            .unwrap();

        assert!(!result.is_complete());
        assert_eq!(result.missing_key(), Some("risky_clauses"));
        // The generation service is never consulted
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rewrites_each_risky_clause() {
        let generator = Arc::new(MockGenerator::with_default_response(
            "Alternative: the vendor shall deliver within 30 days\n\
             Change 1: replaced 'reasonable time'\n\
             Change 2: added a cure period\n\
             Risk addressed: removes ambiguity\n",
        ));
        let stage = SuggestionStage::new(generator.clone());

        let result = stage
            .process("document", &context_with_risks(2))
            .await
            .unwrap();

        let alternatives = result.get("alternatives").unwrap().as_array().unwrap();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(
            alternatives[0]["alternative_version"],
            serde_json::json!("the vendor shall deliver within 30 days")
        );
        assert_eq!(
            alternatives[0]["changes"].as_array().map(Vec::len),
            Some(2)
        );
        assert_eq!(alternatives[0]["original_clause"]["clause"], serde_json::json!("clause 0"));

        // 2 rewrites + 2 explanations + 2 guidance calls
        assert_eq!(generator.call_count(), 6);
        assert_eq!(
            result.get("explanations").unwrap().as_array().map(Vec::len),
            Some(2)
        );
        assert_eq!(result.get("guidance").unwrap().as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_empty_risky_list_produces_empty_results() {
        let generator = Arc::new(MockGenerator::new());
        let stage = SuggestionStage::new(generator.clone());

        let result = stage
            .process("document", &context_with_risks(0))
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.get("alternatives"), Some(&serde_json::json!([])));
        assert_eq!(generator.call_count(), 0);
    }
}
