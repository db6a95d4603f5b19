//! Initial document review: parties, dates, obligations and key terms.

use super::records_to_json;
use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use crate::generate::Generator;
use crate::parse::parse_records;
use crate::stage::{Stage, StageData, StageResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::Arc;

const DATE_PATTERNS: [&str; 3] = [
    r"\d{1,2}/\d{1,2}/\d{2,4}",
    r"\d{1,2}-\d{1,2}-\d{2,4}",
    r"(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{1,2},? \d{4}",
];

/// Characters of surrounding text captured around each extracted date.
const DATE_CONTEXT_CHARS: usize = 50;

/// Extracts the basic facts of the document.
///
/// Parties, obligations and key terms come from three concurrent generation
/// calls; dates are pulled directly from the document text with regexes and
/// normalized to ISO form.
pub struct ReviewStage {
    generator: Arc<dyn Generator>,
    date_patterns: Vec<Regex>,
}

impl ReviewStage {
    /// Stage identifier.
    pub const ID: &'static str = "review";

    /// Creates the stage.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            date_patterns: DATE_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("static pattern"))
                .collect(),
        }
    }

    async fn extract(&self, prompt: String) -> Result<serde_json::Value, GenerationError> {
        let response = self.generator.generate(&prompt).await?;
        Ok(records_to_json(&parse_records(&response)))
    }

    fn extract_dates(&self, document: &str) -> serde_json::Value {
        let mut dates = Vec::new();
        for pattern in &self.date_patterns {
            for found in pattern.find_iter(document) {
                let Some(normalized) = normalize_date(found.as_str()) else {
                    continue;
                };
                dates.push(serde_json::json!({
                    "date": normalized,
                    "context": context_window(document, found.start(), found.end()),
                }));
            }
        }
        serde_json::Value::Array(dates)
    }
}

impl std::fmt::Debug for ReviewStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewStage").finish()
    }
}

#[async_trait]
impl Stage for ReviewStage {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        document: &str,
        _ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError> {
        let dates = self.extract_dates(document);

        let (parties, obligations, key_terms) = tokio::try_join!(
            self.extract(parties_prompt(document)),
            self.extract(obligations_prompt(document)),
            self.extract(key_terms_prompt(document)),
        )?;

        let mut data = StageData::new();
        data.insert("parties".to_string(), parties);
        data.insert("dates".to_string(), dates);
        data.insert("obligations".to_string(), obligations);
        data.insert("key_terms".to_string(), key_terms);
        Ok(StageResult::complete(data))
    }
}

/// Normalizes a matched date string to `YYYY-MM-DD`, or `None` when the match
/// is not a real calendar date.
fn normalize_date(raw: &str) -> Option<String> {
    let parsed = if raw.contains('/') {
        NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok()
    } else if raw.contains('-') {
        NaiveDate::parse_from_str(raw, "%m-%d-%Y").ok()
    } else {
        let cleaned = raw.replace(',', "");
        NaiveDate::parse_from_str(&cleaned, "%B %d %Y")
            .or_else(|_| NaiveDate::parse_from_str(&cleaned, "%b %d %Y"))
            .ok()
    };
    parsed.map(|date| date.format("%Y-%m-%d").to_string())
}

/// Returns the match plus up to [`DATE_CONTEXT_CHARS`] characters on each
/// side, respecting UTF-8 boundaries.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let before: String = {
        let mut chars: Vec<char> = text[..start].chars().rev().take(DATE_CONTEXT_CHARS).collect();
        chars.reverse();
        chars.into_iter().collect()
    };
    let after: String = text[end..].chars().take(DATE_CONTEXT_CHARS).collect();
    format!("{before}{}{after}", &text[start..end])
}

fn parties_prompt(document: &str) -> String {
    format!(
        "Identify every party in the following contract. For each party answer in this form:\n\
         Name: <party name>\n\
         Type: <individual, corporation, or government entity>\n\
         Role: <role in the agreement>\n\
         Separate parties with a blank line.\n\n\
         Contract text:\n{document}"
    )
}

fn obligations_prompt(document: &str) -> String {
    format!(
        "List every obligation, duty or responsibility in the following contract. For each one answer in this form:\n\
         Party: <the obligated party>\n\
         Obligation: <what must be done>\n\
         Deadline: <any condition or deadline>\n\
         Separate obligations with a blank line.\n\n\
         Contract text:\n{document}"
    )
}

fn key_terms_prompt(document: &str) -> String {
    format!(
        "Identify the important defined terms and key concepts in the following contract. For each term answer in this form:\n\
         Term: <the term>\n\
         Definition: <its meaning in this document>\n\
         Limitations: <any conditions attached to it>\n\
         Separate terms with a blank line.\n\n\
         Contract text:\n{document}"
    )
}
