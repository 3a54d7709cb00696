use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub mod jsonl;

/// One run's raw result document, as written by the benchmark client.
///
/// Two client versions are in circulation and produce structurally different
/// documents. The shape is resolved once, here, when the document is read;
/// everything downstream works with the resolved variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawRunResult {
    /// A sequence of request entries, each wrapping the sent message and the
    /// client-observed outcome.
    Nested(Vec<NestedRecord>),
    /// A flattened tabular export: one row per request with the run-level
    /// aggregate counters repeated on every row.
    Flattened(Vec<FlatRecord>),
}

impl RawRunResult {
    /// Read and shape-resolve a result document from a file.
    ///
    /// A document matching neither shape is reported as [`ResultError::Shape`]
    /// so that callers can exclude the run without failing the batch.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResultError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// One entry of the nested result shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NestedRecord {
    pub message: RawMessage,
    pub success: bool,
}

/// The message half of a [`NestedRecord`].
///
/// Fields are kept in their wire form. Timestamps stay strings here because a
/// single malformed timestamp must only discard that event, not the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMessage {
    pub method: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
}

/// One row of the flattened result shape.
///
/// The aggregate counters are run totals, identical on every row. Some client
/// builds report a per-row `response_time_ms`, others only the accumulated
/// `total_response_time_ms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlatRecord {
    pub method: String,
    pub timestamp: String,
    #[serde(default)]
    pub successful_posts: Option<u64>,
    #[serde(default)]
    pub failed_posts: Option<u64>,
    #[serde(default)]
    pub successful_gets: Option<u64>,
    #[serde(default)]
    pub failed_gets: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_response_time_ms: Option<f64>,
}

/// One per-node utilization sample, as collected on the cluster nodes.
///
/// Produced as JSON Lines, one file per (run, cluster role). Values are
/// optional because collectors emit partial lines when a probe fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UtilizationRecord {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default)]
    pub memory_usage_bytes: Option<f64>,
    #[serde(default)]
    pub cpu_usage_percent: Option<f64>,
}

/// Ground-truth snapshot of the persisted state after a run.
///
/// Holds the message contents found in the target database. A POST is only
/// considered successful if its content survived the migration, i.e. is a
/// member of this set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StateSnapshot {
    contents: HashSet<String>,
}

impl StateSnapshot {
    pub fn from_contents<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contents: contents.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a snapshot from a JSON file containing an array of persisted
    /// message contents.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResultError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn contains(&self, content: &str) -> bool {
        self.contents.contains(content)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// An error reading one of the raw input files.
#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Document matches neither result shape: {0}")]
    Shape(#[from] serde_json::Error),
}

impl ResultError {
    /// Whether the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResultError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Parse a timestamp in the formats the collectors write.
///
/// RFC 3339 is what current clients emit; the space-separated naive form
/// appears in older captures. Both are interpreted as UTC. Returns [`None`]
/// for anything else so callers can discard the single record.
pub fn parse_record_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_should_resolve_nested_shape() {
        let doc = r#"[
            {"message": {"method": "POST", "timestamp": "2025-01-01T10:00:00Z", "content": "msg-1"}, "success": true},
            {"message": {"method": "GET", "timestamp": "2025-01-01T10:00:01Z"}, "success": false}
        ]"#;

        let result: RawRunResult = serde_json::from_str(doc).unwrap();
        let RawRunResult::Nested(records) = result else {
            panic!("Expected nested shape");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.content.as_deref(), Some("msg-1"));
        assert!(!records[1].success);
    }

    #[test]
    fn test_should_resolve_flattened_shape() {
        let doc = r#"[
            {"method": "POST", "timestamp": "2025-01-01T10:00:00Z", "successful_posts": 500, "failed_posts": 2, "successful_gets": 498, "failed_gets": 0, "response_time_ms": 4.2}
        ]"#;

        let result: RawRunResult = serde_json::from_str(doc).unwrap();
        let RawRunResult::Flattened(rows) = result else {
            panic!("Expected flattened shape");
        };
        assert_eq!(rows[0].successful_posts, Some(500));
        assert_eq!(rows[0].response_time_ms, Some(4.2));
    }

    #[test]
    fn test_should_reject_unrecognized_shape() {
        let doc = r#"{"entirely": "different"}"#;
        let result = serde_json::from_str::<RawRunResult>(doc);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_parse_both_timestamp_formats() {
        let rfc = parse_record_timestamp("2025-01-01T10:00:00.250Z").unwrap();
        let naive = parse_record_timestamp("2025-01-01 10:00:00.250").unwrap();
        assert_eq!(rfc, naive);

        assert!(parse_record_timestamp("ten past ten").is_none());
    }

    #[test]
    fn test_snapshot_membership() {
        let snapshot = StateSnapshot::from_contents(["msg-1", "msg-2"]);
        assert!(snapshot.contains("msg-1"));
        assert!(!snapshot.contains("msg-3"));
        assert_eq!(snapshot.len(), 2);
    }
}
