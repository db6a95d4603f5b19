//! Keyword-based routing of record fields into named buckets.

use super::Record;
use std::collections::HashMap;

/// Bucket name to collected values, in field-encounter order.
pub type BucketMap = HashMap<String, Vec<String>>;

/// Routes record fields into named buckets by label keyword.
///
/// The router holds an ordered `keyword -> bucket` table. A field whose label
/// contains a keyword (case-insensitive substring test) contributes its value
/// to that keyword's bucket; when several keywords match, the first entry in
/// table order wins. Fields matching no keyword are dropped.
///
/// This is the one post-processing routine shared by every stage - a stage
/// differs only in the table it supplies.
#[derive(Debug, Clone)]
pub struct KeywordRouter {
    routes: Vec<(String, String)>,
}

impl KeywordRouter {
    /// Creates a router from an ordered `keyword -> bucket` table.
    #[must_use]
    pub fn new<K, B>(routes: impl IntoIterator<Item = (K, B)>) -> Self
    where
        K: Into<String>,
        B: Into<String>,
    {
        Self {
            routes: routes
                .into_iter()
                .map(|(k, b)| (k.into().to_lowercase(), b.into()))
                .collect(),
        }
    }

    /// Returns the bucket for a label, if any keyword matches.
    #[must_use]
    pub fn bucket_for(&self, label: &str) -> Option<&str> {
        let label = label.to_lowercase();
        self.routes
            .iter()
            .find(|(keyword, _)| label.contains(keyword))
            .map(|(_, bucket)| bucket.as_str())
    }

    /// Routes one record's fields into buckets.
    #[must_use]
    pub fn route(&self, record: &Record) -> BucketMap {
        let mut buckets = BucketMap::new();
        self.route_into(record, &mut buckets);
        buckets
    }

    /// Routes every record's fields into one shared bucket map.
    #[must_use]
    pub fn route_all(&self, records: &[Record]) -> BucketMap {
        let mut buckets = BucketMap::new();
        for record in records {
            self.route_into(record, &mut buckets);
        }
        buckets
    }

    fn route_into(&self, record: &Record, buckets: &mut BucketMap) {
        for (label, value) in record.iter() {
            if let Some(bucket) = self.bucket_for(label) {
                buckets
                    .entry(bucket.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
    }
}
