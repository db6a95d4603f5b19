//! Clause extraction and comparison against standard templates.

use super::{flatten_fields, records_to_json};
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::{parse_records, Record};
use crate::stage::{Stage, StageData, StageResult};
use crate::store::{Template, TemplateStore};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Extracts the document's clauses and compares each against the template
/// store.
///
/// Template candidates are selected by bidirectional case-insensitive
/// substring containment between the clause's detected `type` label and the
/// template identifiers. Clauses without a matching template get an
/// unmatched-comparison entry and an alignment recommendation.
pub struct ClauseStage {
    generator: Arc<dyn Generator>,
    templates: Arc<TemplateStore>,
}

impl ClauseStage {
    /// Stage identifier.
    pub const ID: &'static str = "clause";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, templates: Arc<TemplateStore>) -> Self {
        Self {
            generator,
            templates,
        }
    }

    /// Compares one clause against every candidate template.
    async fn compare(&self, clause: &Record) -> Result<Vec<serde_json::Value>, GenerationError> {
        let candidates = self.templates.candidates(clause.get_or_empty("type"));
        if candidates.is_empty() {
            return Ok(vec![serde_json::json!({
                "clause": clause.to_json(),
                "template_match": false,
                "differences": ["no matching template found"],
                "recommendation": "review clause for standardization",
            })]);
        }

        let mut comparisons = Vec::with_capacity(candidates.len());
        for template in candidates {
            let response = self
                .generator
                .generate(&compare_prompt(clause, template))
                .await?;
            let mut comparison = flatten_fields(&parse_records(&response));
            comparison.insert("clause".to_string(), clause.to_json());
            comparison.insert("template".to_string(), serde_json::json!(template.id));
            comparison.insert("template_match".to_string(), serde_json::json!(true));
            comparisons.push(serde_json::Value::Object(comparison));
        }
        Ok(comparisons)
    }

    /// Generates an alignment recommendation for an unmatched comparison.
    async fn recommend(
        &self,
        comparison: &serde_json::Value,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .generator
            .generate(&recommendation_prompt(comparison))
            .await?;
        let mut recommendation = flatten_fields(&parse_records(&response));
        recommendation.insert(
            "clause".to_string(),
            comparison.get("clause").cloned().unwrap_or_default(),
        );
        Ok(serde_json::Value::Object(recommendation))
    }
}

impl std::fmt::Debug for ClauseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClauseStage")
            .field("templates", &self.templates.len())
            .finish()
    }
}

#[async_trait]
impl Stage for ClauseStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        document: &str,
        _ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let response = self.generator.generate(&extract_prompt(document)).await?;
        let clauses = parse_records(&response);

        let comparisons: Vec<serde_json::Value> =
            try_join_all(clauses.iter().map(|clause| self.compare(clause)))
                .await?
                .into_iter()
                .flatten()
                .collect();

        let unmatched = comparisons
            .iter()
            .filter(|c| c.get("template_match") == Some(&serde_json::json!(false)));
        let recommendations =
            try_join_all(unmatched.map(|comparison| self.recommend(comparison))).await?;

        let mut data = StageData::new();
        data.insert("clauses".to_string(), records_to_json(&clauses));
        data.insert(
            "comparisons".to_string(),
            serde_json::Value::Array(comparisons),
        );
        data.insert(
            "recommendations".to_string(),
            serde_json::Value::Array(recommendations),
        );
        Ok(StageResult::complete(data))
    }
}

fn extract_prompt(document: &str) -> String {
    format!(
        "Extract every distinct clause from the following contract. For each clause answer in this form:\n\
         Text: <the clause text>\n\
         Type: <definition, obligation, limitation, termination, payment, or similar>\n\
         Section: <where it appears>\n\
         Terms: <key terms or conditions>\n\
         Separate clauses with a blank line.\n\n\
         Contract text:\n{document}"
    )
}

fn compare_prompt(clause: &Record, template: &Template) -> String {
    format!(
        "Compare this contract clause with its standard template.\n\n\
         Clause:\n{}\n\n\
         Template:\n{}\n\n\
         Answer in this form:\n\
         Differences: <key differences>\n\
         Missing: <elements the template has that the clause lacks>\n\
         Additional: <elements the clause adds>\n\
         Concerns: <potential issues>\n\
         Recommendation: <how to align them>",
        clause.get_or_empty("text"),
        template.text,
    )
}

fn recommendation_prompt(comparison: &serde_json::Value) -> String {
    format!(
        "No standard template matched this contract clause. Recommend how to standardize it.\n\n\
         Clause:\n{}\n\n\
         Answer in this form:\n\
         Language: <specific wording changes>\n\
         Structure: <structural changes required>\n\
         Considerations: <anything else to weigh>",
        super::field(comparison.get("clause").unwrap_or(&serde_json::Value::Null), "text"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;
    use pretty_assertions::assert_eq;

    fn templates() -> Arc<TemplateStore> {
        let mut store = TemplateStore::new();
        store.insert(Template::new("termination", "either party may terminate on notice"));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_matched_clause_is_compared() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Text: termination on breach\nType: termination\nSection: 9\n");
        generator.set_default_response("Differences: notice period missing\nRecommendation: add notice\n");

        let stage = ClauseStage::new(generator.clone(), templates());
        let result = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        let comparisons = result.get("comparisons").unwrap().as_array().unwrap();
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0]["template_match"], serde_json::json!(true));
        assert_eq!(comparisons[0]["template"], serde_json::json!("termination"));
        assert_eq!(
            comparisons[0]["differences"],
            serde_json::json!("notice period missing")
        );

        // No unmatched comparisons, so no recommendation calls
        assert_eq!(result.get("recommendations"), Some(&serde_json::json!([])));
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_clause_gets_recommendation() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Text: bespoke exclusivity wording\nType: exclusivity\nSection: 4\n");
        generator.set_default_response("Language: adopt standard wording\n");

        let stage = ClauseStage::new(generator.clone(), templates());
        let result = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        let comparisons = result.get("comparisons").unwrap().as_array().unwrap();
        assert_eq!(comparisons[0]["template_match"], serde_json::json!(false));
        assert_eq!(
            comparisons[0]["differences"],
            serde_json::json!(["no matching template found"])
        );

        let recommendations = result.get("recommendations").unwrap().as_array().unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(
            recommendations[0]["language"],
            serde_json::json!("adopt standard wording")
        );

        // 1 extract + 1 recommendation; the unmatched comparison needs no call
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_typeless_clause_matches_nothing() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_response("Text: stray wording without a type label\n");
        generator.set_default_response("Language: classify the clause\n");

        let stage = ClauseStage::new(generator, templates());
        let result = stage
            .process("contract", &AnalysisContext::new())
            .await
            .unwrap();

        let comparisons = result.get("comparisons").unwrap().as_array().unwrap();
        assert_eq!(comparisons[0]["template_match"], serde_json::json!(false));
    }
}
