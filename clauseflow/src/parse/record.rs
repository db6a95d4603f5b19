//! The lenient line-oriented record parser.
//!
//! Generated analysis text arrives as paragraphs of `Label: value` lines.
//! [`parse_records`] turns such text into an ordered sequence of [`Record`]s
//! without ever failing - malformed input degrades to fewer or emptier
//! records, never to an error.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One structured record parsed from a paragraph of generated text.
///
/// A record maps normalized lowercase labels to trimmed text values. Fields
/// iterate in first-insertion order; writing a label that already exists
/// overwrites the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, overwriting a prior value for the same label while
    /// keeping the label's original position.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(l, _)| *l == label) {
            slot.1 = value;
        } else {
            self.fields.push((label, value));
        }
    }

    /// Gets a field value by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Gets a field value by label, or an empty string.
    #[must_use]
    pub fn get_or_empty(&self, label: &str) -> &str {
        self.get(label).unwrap_or("")
    }

    /// Checks whether a label is present.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.fields.iter().any(|(l, _)| l == label)
    }

    /// Iterates fields in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts the record to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (label, value) in &self.fields {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Parses generated text into an ordered sequence of records.
///
/// Scan rules, line by line:
/// - A line containing `:` is split at the first occurrence; the left part,
///   lowercased and trimmed, becomes a field label, the right part, trimmed,
///   the value. The pair goes into the currently open record.
/// - A blank line seals the open record when it is non-empty; blank lines
///   never produce empty records.
/// - A non-blank line with no separator also seals the open record; the line
///   itself is discarded. It is a boundary signal, not a data line.
/// - End of input seals a non-empty open record.
///
/// Text with no separator anywhere yields an empty sequence. Output order is
/// seal order.
#[must_use]
pub fn parse_records(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current = Record::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            seal(&mut records, &mut current);
            continue;
        }
        match line.split_once(':') {
            Some((label, value)) => {
                current.insert(label.trim().to_lowercase(), value.trim());
            }
            None => seal(&mut records, &mut current),
        }
    }

    seal(&mut records, &mut current);
    records
}

fn seal(records: &mut Vec<Record>, current: &mut Record) {
    if !current.is_empty() {
        records.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(fields: &[(&str, &str)]) -> Record {
        let mut r = Record::new();
        for (l, v) in fields {
            r.insert(*l, *v);
        }
        r
    }

    #[test]
    fn test_blank_line_separates_records() {
        let text = "Name: Acme Corp\nRole: contractor\n\nName: Jane Doe\nRole: client\n";
        let records = parse_records(text);

        assert_eq!(
            records,
            vec![
                record(&[("name", "Acme Corp"), ("role", "contractor")]),
                record(&[("name", "Jane Doe"), ("role", "client")]),
            ]
        );
    }

    #[test]
    fn test_no_separator_yields_empty_sequence() {
        let text = "just prose\nmore prose without any labels\n";
        assert!(parse_records(text).is_empty());
    }

    #[test]
    fn test_labels_lowercased_and_trimmed() {
        let records = parse_records("  Clause Text :  the vendor shall deliver  \n");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("clause text"), Some("the vendor shall deliver"));
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let records = parse_records("Deadline: due by 17:00 on Friday\n");
        assert_eq!(records[0].get("deadline"), Some("due by 17:00 on Friday"));
    }

    #[test]
    fn test_duplicate_label_overwrites_in_place() {
        let records = parse_records("Risk: low\nImpact: minor\nRisk: high\n");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("risk"), Some("high"));
        // Position of the first insertion is preserved
        let labels: Vec<&str> = records[0].iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["risk", "impact"]);
    }

    #[test]
    fn test_separatorless_line_seals_and_is_discarded() {
        let text = "Clause: payment terms\nRisk: ambiguity\nHere is another finding\nClause: termination\n";
        let records = parse_records(text);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("clause"), Some("payment terms"));
        assert_eq!(records[1].get("clause"), Some("termination"));
        // The boundary line contributed no field anywhere
        assert!(records.iter().all(|r| !r.iter().any(|(_, v)| v.contains("another finding"))));
    }

    #[test]
    fn test_separatorless_line_with_nothing_open_is_ignored() {
        let records = parse_records("Preamble without labels\nClause: scope\n");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("clause"), Some("scope"));
    }

    #[test]
    fn test_consecutive_blank_lines_produce_no_empty_records() {
        let records = parse_records("\n\n\nName: Acme\n\n\n\n");
        assert_eq!(records, vec![record(&[("name", "Acme")])]);
    }

    #[test]
    fn test_trailing_record_sealed_at_end_of_input() {
        let records = parse_records("Term: indemnity\nDefinition: holds harmless");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("definition"), Some("holds harmless"));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "A: 1\nB: 2\n\nnote\nC: 3\n";
        assert_eq!(parse_records(text), parse_records(text));
    }

    #[test]
    fn test_all_labels_lowercase_and_trimmed_property() {
        let text = "PARTY NAME: Acme\n  Obligation  : deliver\n\nROLE: client\n";
        for rec in parse_records(text) {
            for (label, value) in rec.iter() {
                assert_eq!(label, label.to_lowercase());
                assert_eq!(label, label.trim());
                assert_eq!(value, value.trim());
            }
        }
    }

    #[test]
    fn test_record_to_json() {
        let rec = record(&[("name", "Acme"), ("role", "vendor")]);
        assert_eq!(
            rec.to_json(),
            serde_json::json!({"name": "Acme", "role": "vendor"})
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_records("").is_empty());
    }
}
