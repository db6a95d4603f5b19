//! Detection of internal contradictions in the document.

use super::{bucket_first, bucket_list, records_to_json};
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::{parse_records, KeywordRouter, Record};
use crate::stage::{Stage, StageData, StageResult};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Finds conflicting dates, obligations, definitions, scope and conditions,
/// then analyzes the impact of each conflict and proposes resolutions.
pub struct InconsistencyStage {
    generator: Arc<dyn Generator>,
    impact_router: KeywordRouter,
    resolution_router: KeywordRouter,
}

impl InconsistencyStage {
    /// Stage identifier.
    pub const ID: &'static str = "inconsistency";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            impact_router: KeywordRouter::new([
                ("severity", "severity"),
                ("consequence", "consequences"),
                ("enforceability", "enforceability_impact"),
                ("right", "rights_impact"),
                ("litigation", "litigation_risk"),
            ]),
            resolution_router: KeywordRouter::new([
                ("language", "language_changes"),
                ("alternative", "alternatives"),
                ("modification", "modifications"),
                ("step", "steps"),
                ("consideration", "considerations"),
            ]),
        }
    }

    async fn analyze_impact(
        &self,
        inconsistency: &Record,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .generator
            .generate(&impact_prompt(inconsistency))
            .await?;
        let mut buckets = self.impact_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "inconsistency": inconsistency.to_json(),
            "severity": bucket_first(&mut buckets, "severity"),
            "consequences": bucket_list(&mut buckets, "consequences"),
            "enforceability_impact": bucket_first(&mut buckets, "enforceability_impact"),
            "rights_impact": bucket_list(&mut buckets, "rights_impact"),
            "litigation_risk": bucket_first(&mut buckets, "litigation_risk"),
        }))
    }

    async fn resolve(
        &self,
        inconsistency: &Record,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .generator
            .generate(&resolution_prompt(inconsistency))
            .await?;
        let mut buckets = self.resolution_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "inconsistency": inconsistency.to_json(),
            "language_changes": bucket_list(&mut buckets, "language_changes"),
            "alternatives": bucket_list(&mut buckets, "alternatives"),
            "modifications": bucket_list(&mut buckets, "modifications"),
            "steps": bucket_list(&mut buckets, "steps"),
            "considerations": bucket_list(&mut buckets, "considerations"),
        }))
    }
}

impl std::fmt::Debug for InconsistencyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InconsistencyStage").finish()
    }
}

#[async_trait]
impl Stage for InconsistencyStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        document: &str,
        _ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let response = self.generator.generate(&identify_prompt(document)).await?;
        let inconsistencies = parse_records(&response);

        let (impact_analysis, recommendations) = futures::try_join!(
            try_join_all(inconsistencies.iter().map(|item| self.analyze_impact(item))),
            try_join_all(inconsistencies.iter().map(|item| self.resolve(item))),
        )?;

        let mut data = StageData::new();
        data.insert(
            "inconsistencies".to_string(),
            records_to_json(&inconsistencies),
        );
        data.insert(
            "impact_analysis".to_string(),
            serde_json::Value::Array(impact_analysis),
        );
        data.insert(
            "recommendations".to_string(),
            serde_json::Value::Array(recommendations),
        );
        Ok(StageResult::complete(data))
    }
}

fn identify_prompt(document: &str) -> String {
    format!(
        "Check the following contract for internal conflicts: contradictory dates, obligations, \
         definitions, scope, or conditions. For each conflict answer in this form:\n\
         Elements: <the conflicting elements>\n\
         Location: <where they appear>\n\
         Type: <temporal, obligation, definition, scope, or condition>\n\
         Impact: <the potential impact>\n\
         Separate conflicts with a blank line.\n\n\
         Contract text:\n{document}"
    )
}

fn impact_prompt(inconsistency: &Record) -> String {
    format!(
        "Analyze the impact of this inconsistency in a contract.\n\n\
         Type: {}\n\
         Conflicting elements: {}\n\
         Location: {}\n\n\
         Answer in this form:\n\
         Severity: <High, Medium, or Low>\n\
         Consequence 1: <a potential legal consequence>\n\
         Consequence 2: <the next consequence, and so on>\n\
         Enforceability: <effect on enforceability>\n\
         Rights: <impact on the parties' rights and obligations>\n\
         Litigation: <risk of disputes>",
        inconsistency.get_or_empty("type"),
        inconsistency.get_or_empty("elements"),
        inconsistency.get_or_empty("location"),
    )
}

fn resolution_prompt(inconsistency: &Record) -> String {
    format!(
        "Recommend how to resolve this inconsistency in a contract.\n\n\
         Type: {}\n\
         Conflicting elements: {}\n\
         Location: {}\n\n\
         Answer in this form:\n\
         Language: <specific wording changes>\n\
         Alternative: <another way to resolve the conflict>\n\
         Modification: <required change to a related provision>\n\
         Step 1: <an implementation step>\n\
         Step 2: <the next step, and so on>\n\
         Consideration: <a precaution to keep in mind>",
        inconsistency.get_or_empty("type"),
        inconsistency.get_or_empty("elements"),
        inconsistency.get_or_empty("location"),
    )
}
