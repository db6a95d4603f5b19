//! Regulatory compliance checks against a rule store.

use super::{bucket_first, bucket_list, records_to_json};
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::{parse_records, KeywordRouter, Record};
use crate::stage::{Stage, StageData, StageResult};
use crate::store::TemplateStore;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Identifies the jurisdictions a document is subject to and checks it
/// against each jurisdiction's stored rules, ending with one aggregate
/// compliance report.
pub struct ComplianceStage {
    generator: Arc<dyn Generator>,
    rules: Arc<TemplateStore>,
    check_router: KeywordRouter,
    report_router: KeywordRouter,
}

impl ComplianceStage {
    /// Stage identifier.
    pub const ID: &'static str = "compliance";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, rules: Arc<TemplateStore>) -> Self {
        Self {
            generator,
            rules,
            check_router: KeywordRouter::new([
                ("status", "status"),
                ("violation", "violations"),
                ("change", "required_changes"),
                ("penalty", "penalties"),
                ("recommendation", "recommendations"),
            ]),
            report_router: KeywordRouter::new([
                ("status", "overall_status"),
                ("finding", "key_findings"),
                ("issue", "critical_issues"),
                ("risk", "risk_assessment"),
                ("action", "action_items"),
                ("strategy", "long_term_strategy"),
            ]),
        }
    }

    async fn check(
        &self,
        document: &str,
        jurisdiction: &Record,
    ) -> Result<serde_json::Value, GenerationError> {
        let name = jurisdiction.get_or_empty("name");
        let rules_text = self
            .rules
            .get(name)
            .map(|rule| rule.text.clone())
            .unwrap_or_default();

        let response = self
            .generator
            .generate(&check_prompt(document, jurisdiction, &rules_text))
            .await?;
        let mut buckets = self.check_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "jurisdiction": jurisdiction.to_json(),
            "status": bucket_first(&mut buckets, "status"),
            "violations": bucket_list(&mut buckets, "violations"),
            "required_changes": bucket_list(&mut buckets, "required_changes"),
            "penalties": bucket_list(&mut buckets, "penalties"),
            "recommendations": bucket_list(&mut buckets, "recommendations"),
        }))
    }

    async fn report(
        &self,
        checks: &[serde_json::Value],
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self.generator.generate(&report_prompt(checks)).await?;
        let mut buckets = self.report_router.route_all(&parse_records(&response));
        Ok(serde_json::json!({
            "overall_status": bucket_first(&mut buckets, "overall_status"),
            "key_findings": bucket_list(&mut buckets, "key_findings"),
            "critical_issues": bucket_list(&mut buckets, "critical_issues"),
            "risk_assessment": bucket_first(&mut buckets, "risk_assessment"),
            "action_items": bucket_list(&mut buckets, "action_items"),
            "long_term_strategy": bucket_list(&mut buckets, "long_term_strategy"),
        }))
    }
}

impl std::fmt::Debug for ComplianceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceStage")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[async_trait]
impl Stage for ComplianceStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        document: &str,
        ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let response = self
            .generator
            .generate(&jurisdictions_prompt(document, ctx))
            .await?;
        let jurisdictions = parse_records(&response);

        let checks = try_join_all(
            jurisdictions
                .iter()
                .map(|jurisdiction| self.check(document, jurisdiction)),
        )
        .await?;
        let report = self.report(&checks).await?;

        let mut data = StageData::new();
        data.insert(
            "jurisdictions".to_string(),
            records_to_json(&jurisdictions),
        );
        data.insert(
            "compliance_checks".to_string(),
            serde_json::Value::Array(checks),
        );
        data.insert("compliance_report".to_string(), report);
        Ok(StageResult::complete(data))
    }
}

fn jurisdictions_prompt(document: &str, ctx: &AnalysisContext) -> String {
    format!(
        "Identify every jurisdiction and regulation this contract is subject to: governing-law \
         clauses, geographic locations, industry rules, cross-border implications. For each one \
         answer in this form:\n\
         Name: <jurisdiction or regulation name>\n\
         Basis: <why it applies>\n\
         Scope: <what it covers here>\n\
         Separate entries with a blank line.\n\n\
         Contract text:\n{document}\n\n\
         Analysis so far:\n{}",
        ctx.to_pretty_json()
    )
}

fn check_prompt(document: &str, jurisdiction: &Record, rules_text: &str) -> String {
    format!(
        "Check this contract for compliance with {name} requirements.\n\n\
         Applicable rules:\n{rules}\n\n\
         Contract text:\n{document}\n\n\
         Answer in this form:\n\
         Status: <compliant, partially compliant, or non-compliant>\n\
         Violation 1: <a specific violation or concern>\n\
         Violation 2: <the next violation, and so on>\n\
         Change: <a change required for compliance>\n\
         Penalty: <a potential penalty for non-compliance>\n\
         Recommendation: <how to achieve compliance>",
        name = jurisdiction.get_or_empty("name"),
        rules = if rules_text.is_empty() { "none on file" } else { rules_text },
    )
}

fn report_prompt(checks: &[serde_json::Value]) -> String {
    format!(
        "Produce an overall compliance report from these per-jurisdiction checks:\n{}\n\n\
         Answer in this form:\n\
         Status: <overall compliance status>\n\
         Finding 1: <a key finding>\n\
         Finding 2: <the next finding, and so on>\n\
         Issue: <a critical issue requiring immediate attention>\n\
         Risk: <overall compliance risk assessment>\n\
         Action: <a prioritized action item>\n\
         Strategy: <a long-term compliance measure>",
        serde_json::to_string_pretty(checks).unwrap_or_else(|_| "[]".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Template;
    use crate::testing::MockGenerator;
    use pretty_assertions::assert_eq;

    fn rules() -> Arc<TemplateStore> {
        let mut store = TemplateStore::new();
        store.insert(Template::new("gdpr", "personal data must have a lawful processing basis"));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_process_checks_each_jurisdiction() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Name: GDPR\nBasis: EU customer data\n\nName: UK law\nBasis: governing law clause\n");
        generator.set_default_response(
            "Status: partially compliant\nViolation: no retention schedule\nRecommendation: add one\n",
        );

        let stage = ComplianceStage::new(generator.clone(), rules());
        let result = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        let jurisdictions = result.get("jurisdictions").unwrap().as_array().unwrap();
        assert_eq!(jurisdictions.len(), 2);

        let checks = result.get("compliance_checks").unwrap().as_array().unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0]["status"], serde_json::json!("partially compliant"));
        assert_eq!(
            checks[0]["violations"],
            serde_json::json!(["no retention schedule"])
        );

        let report = result.get("compliance_report").unwrap();
        assert_eq!(report["overall_status"], serde_json::json!("partially compliant"));

        // 1 jurisdictions + 2 checks + 1 report
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test]
    async fn test_rules_are_injected_into_check_prompts() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Name: GDPR\nBasis: data processing\n");
        generator.set_default_response("Status: compliant\n");

        let stage = ComplianceStage::new(generator.clone(), rules());
        stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        let prompts = generator.recorded_prompts();
        // The check prompt (second call) carries the stored rule text
        assert!(prompts[1].contains("lawful processing basis"));
    }

    #[tokio::test]
    async fn test_unknown_jurisdiction_uses_empty_rules() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Name: Mars colony charter\n");
        generator.set_default_response("Status: unknown\n");

        let stage = ComplianceStage::new(generator.clone(), rules());
        stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        assert!(generator.recorded_prompts()[1].contains("none on file"));
    }
}
