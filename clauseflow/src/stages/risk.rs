//! Risk analysis: risky clause identification, severity, mitigation.

use super::{flatten_fields, records_to_json};
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::{parse_records, Record};
use crate::stage::{Stage, StageData, StageResult};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Finds risky or ambiguous clauses, then assesses each one.
///
/// One generation call identifies candidates; severity analysis and
/// mitigation recommendations then fan out per clause and are joined before
/// the stage returns.
pub struct RiskStage {
    generator: Arc<dyn Generator>,
}

impl RiskStage {
    /// Stage identifier.
    pub const ID: &'static str = "risk";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    async fn assess(&self, clause: &Record) -> Result<serde_json::Value, GenerationError> {
        let response = self.generator.generate(&severity_prompt(clause)).await?;
        let mut finding = flatten_fields(&parse_records(&response));
        finding.insert("clause".to_string(), clause.to_json());
        Ok(serde_json::Value::Object(finding))
    }

    async fn recommend(&self, clause: &Record) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .generator
            .generate(&recommendation_prompt(clause))
            .await?;
        let mut finding = flatten_fields(&parse_records(&response));
        finding.insert("clause".to_string(), clause.to_json());
        Ok(serde_json::Value::Object(finding))
    }
}

impl std::fmt::Debug for RiskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskStage").finish()
    }
}

#[async_trait]
impl Stage for RiskStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        document: &str,
        _ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let response = self.generator.generate(&identify_prompt(document)).await?;
        let risky = parse_records(&response);

        let (analysis, recommendations) = futures::try_join!(
            try_join_all(risky.iter().map(|clause| self.assess(clause))),
            try_join_all(risky.iter().map(|clause| self.recommend(clause))),
        )?;

        let mut data = StageData::new();
        data.insert("risky_clauses".to_string(), records_to_json(&risky));
        data.insert("risk_analysis".to_string(), serde_json::Value::Array(analysis));
        data.insert(
            "recommendations".to_string(),
            serde_json::Value::Array(recommendations),
        );
        Ok(StageResult::complete(data))
    }
}

fn identify_prompt(document: &str) -> String {
    format!(
        "Review the following contract for clauses with vague language, unclear obligations, \
         unbalanced provisions, or missing information. For each risky clause answer in this form:\n\
         Clause: <the clause text>\n\
         Risk: <the specific concern>\n\
         Impact: <the potential impact>\n\
         Section: <where it appears>\n\
         Separate clauses with a blank line.\n\n\
         Contract text:\n{document}"
    )
}

fn severity_prompt(clause: &Record) -> String {
    format!(
        "Assess the severity of this risky contract clause.\n\n\
         Clause: {}\n\
         Risk: {}\n\
         Impact: {}\n\n\
         Answer in this form:\n\
         Severity: <High, Medium, or Low>\n\
         Justification: <why>\n\
         Implications: <potential legal implications>\n\
         Mitigation: <suggested mitigation strategy>",
        clause.get_or_empty("clause"),
        clause.get_or_empty("risk"),
        clause.get_or_empty("impact"),
    )
}

fn recommendation_prompt(clause: &Record) -> String {
    format!(
        "Recommend concrete fixes for this risky contract clause.\n\n\
         Clause: {}\n\
         Risk: {}\n\
         Impact: {}\n\n\
         Answer in this form:\n\
         Language: <specific wording changes>\n\
         Alternative: <an alternative formulation>\n\
         Additions: <provisions that should be added>\n\
         Definitions: <definitions or clarifications needed>",
        clause.get_or_empty("clause"),
        clause.get_or_empty("risk"),
        clause.get_or_empty("impact"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_process_fans_out_per_clause() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response(
            "Clause: payment within reasonable time\nRisk: ambiguity\nImpact: disputes\n\n\
             Clause: unlimited liability\nRisk: unbounded exposure\nImpact: financial\n",
        );
        generator.set_default_response("Severity: High\nJustification: open-ended\n");

        let stage = RiskStage::new(generator.clone());
        let result = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        let risky = result.get("risky_clauses").unwrap().as_array().unwrap();
        assert_eq!(risky.len(), 2);

        let analysis = result.get("risk_analysis").unwrap().as_array().unwrap();
        assert_eq!(analysis.len(), 2);
        assert_eq!(analysis[0]["severity"], serde_json::json!("High"));
        assert_eq!(
            analysis[0]["clause"]["clause"],
            serde_json::json!("payment within reasonable time")
        );

        // 1 identify + 2 assessments + 2 recommendations
        assert_eq!(generator.call_count(), 5);
    }

    #[tokio::test]
    async fn test_no_risky_clauses_short_circuits() {
        let generator = Arc::new(MockGenerator::with_default_response("no labelled findings"));
        let stage = RiskStage::new(generator.clone());

        let result = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        assert_eq!(result.get("risky_clauses"), Some(&serde_json::json!([])));
        assert_eq!(result.get("risk_analysis"), Some(&serde_json::json!([])));
        // Only the identification call - nothing to fan out over
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_per_clause_failure_propagates() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Clause: x\nRisk: y\n");
        generator.fail_after(1, "rate limited");

        let stage = RiskStage::new(generator);
        let err = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap_err();
        assert!(err.reason.contains("rate limited"));
    }
}
