//! Final summarization of the whole analysis.

use super::{bucket_first, bucket_list, records_to_json};
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::{parse_records, KeywordRouter};
use crate::stage::{Stage, StageData, StageResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Produces executive and detailed summaries of the document plus key
/// findings and recommendations distilled from the accumulated context.
///
/// Runs last so its prompts can see every upstream finding. The four
/// generation calls are independent and issued concurrently; the two
/// context-only calls short-circuit to empty lists when the context is
/// empty.
pub struct SummaryStage {
    generator: Arc<dyn Generator>,
    executive_router: KeywordRouter,
    detailed_router: KeywordRouter,
}

impl SummaryStage {
    /// Stage identifier.
    pub const ID: &'static str = "summary";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            executive_router: KeywordRouter::new([
                ("overview", "overview"),
                ("point", "key_points"),
                ("issue", "critical_issues"),
                ("risk", "risk_assessment"),
                ("compliance", "compliance_status"),
                ("step", "next_steps"),
            ]),
            detailed_router: KeywordRouter::new([
                ("structure", "structure"),
                ("section", "section_analysis"),
                ("implication", "legal_implications"),
                ("technical", "technical_details"),
                ("operational", "operational_requirements"),
                ("implementation", "implementation_considerations"),
            ]),
        }
    }

    async fn executive(
        &self,
        document: &str,
        ctx: &AnalysisContext,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .generator
            .generate(&executive_prompt(document, ctx))
            .await?;
        let mut buckets = self.executive_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "overview": bucket_first(&mut buckets, "overview"),
            "key_points": bucket_list(&mut buckets, "key_points"),
            "critical_issues": bucket_list(&mut buckets, "critical_issues"),
            "risk_assessment": bucket_first(&mut buckets, "risk_assessment"),
            "compliance_status": bucket_first(&mut buckets, "compliance_status"),
            "next_steps": bucket_list(&mut buckets, "next_steps"),
        }))
    }

    async fn detailed(
        &self,
        document: &str,
        ctx: &AnalysisContext,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .generator
            .generate(&detailed_prompt(document, ctx))
            .await?;
        let mut buckets = self.detailed_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "structure": bucket_first(&mut buckets, "structure"),
            "section_analysis": bucket_list(&mut buckets, "section_analysis"),
            "legal_implications": bucket_list(&mut buckets, "legal_implications"),
            "technical_details": bucket_list(&mut buckets, "technical_details"),
            "operational_requirements": bucket_list(&mut buckets, "operational_requirements"),
            "implementation_considerations": bucket_list(&mut buckets, "implementation_considerations"),
        }))
    }

    /// Context-only extraction shared by key findings and recommendations.
    async fn from_context(
        &self,
        ctx: &AnalysisContext,
        prompt: fn(&AnalysisContext) -> String,
    ) -> Result<serde_json::Value, GenerationError> {
        if ctx.is_empty() {
            return Ok(serde_json::json!([]));
        }
        let response = self.generator.generate(&prompt(ctx)).await?;
        Ok(records_to_json(&parse_records(&response)))
    }
}

impl std::fmt::Debug for SummaryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryStage").finish()
    }
}

#[async_trait]
impl Stage for SummaryStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        document: &str,
        ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let (executive_summary, detailed_summary, key_findings, recommendations) = tokio::try_join!(
            self.executive(document, ctx),
            self.detailed(document, ctx),
            self.from_context(ctx, findings_prompt),
            self.from_context(ctx, recommendations_prompt),
        )?;

        let mut data = StageData::new();
        data.insert("executive_summary".to_string(), executive_summary);
        data.insert("detailed_summary".to_string(), detailed_summary);
        data.insert("key_findings".to_string(), key_findings);
        data.insert("recommendations".to_string(), recommendations);
        Ok(StageResult::complete(data))
    }
}

fn executive_prompt(document: &str, ctx: &AnalysisContext) -> String {
    format!(
        "Write an executive summary of this contract analysis.\n\n\
         Contract text:\n{document}\n\n\
         Analysis so far:\n{}\n\n\
         Answer in this form:\n\
         Overview: <one-paragraph document overview>\n\
         Point 1: <a key point>\n\
         Point 2: <the next point, and so on>\n\
         Issue: <a critical issue>\n\
         Risk: <overall risk assessment>\n\
         Compliance: <overall compliance status>\n\
         Step: <a recommended next step>",
        ctx.to_pretty_json()
    )
}

fn detailed_prompt(document: &str, ctx: &AnalysisContext) -> String {
    format!(
        "Write a detailed summary of this contract analysis.\n\n\
         Contract text:\n{document}\n\n\
         Analysis so far:\n{}\n\n\
         Answer in this form:\n\
         Structure: <how the document is organized>\n\
         Section 1: <analysis of a major section>\n\
         Section 2: <the next section, and so on>\n\
         Implication: <a legal implication>\n\
         Technical: <a technical detail or specification>\n\
         Operational: <an operational requirement>\n\
         Implementation: <an implementation consideration>",
        ctx.to_pretty_json()
    )
}

fn findings_prompt(ctx: &AnalysisContext) -> String {
    format!(
        "Distill the key findings from this contract analysis:\n{}\n\n\
         For each finding answer in this form:\n\
         Finding: <the finding>\n\
         Severity: <High, Medium, or Low>\n\
         Area: <risk, compliance, consistency, or drafting>\n\
         Separate findings with a blank line.",
        ctx.to_pretty_json()
    )
}

fn recommendations_prompt(ctx: &AnalysisContext) -> String {
    format!(
        "Distill prioritized recommendations from this contract analysis:\n{}\n\n\
         For each recommendation answer in this form:\n\
         Recommendation: <the action>\n\
         Priority: <immediate, short-term, or long-term>\n\
         Rationale: <why>\n\
         Separate recommendations with a blank line.",
        ctx.to_pretty_json()
    )
}
