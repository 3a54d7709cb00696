use std::io::BufRead as _;

/// A reader for JSON Lines (jsonl) files.
///
/// The utilization collectors append one JSON object per line and may be
/// killed mid-write, so the last line of a capture is occasionally truncated.
/// With `skip_invalid` set, such lines are dropped and counted instead of
/// failing the whole file.
#[derive(Debug, Default)]
pub struct JsonlReader {
    pub skip_invalid: bool,
}

/// The outcome of parsing one jsonl file: the valid records plus the number
/// of lines that were dropped.
#[derive(Debug)]
pub struct JsonlDocument<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl JsonlReader {
    pub fn lenient() -> Self {
        Self { skip_invalid: true }
    }

    /// Parse a JSON Lines stream into records of type `T`.
    pub fn parse<R, T>(&self, reader: R) -> Result<JsonlDocument<T>, JsonlError>
    where
        R: std::io::Read,
        T: serde::de::DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut skipped = 0;
        for line in std::io::BufReader::new(reader).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(value) => records.push(value),
                Err(e) if self.skip_invalid => {
                    log::trace!("Skipping invalid entry: {e}");
                    skipped += 1;
                }
                Err(e) => return Err(JsonlError::Serde(e)),
            }
        }
        Ok(JsonlDocument { records, skipped })
    }

    /// Parse a JSON Lines file from the specified path into records of type `T`.
    pub fn parse_from_file<P, T>(&self, path: P) -> Result<JsonlDocument<T>, JsonlError>
    where
        P: AsRef<std::path::Path>,
        T: serde::de::DeserializeOwned,
    {
        let file = std::fs::File::open(path)?;
        self.parse(file)
    }
}

/// An error type for [`JsonlReader::parse`].
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl JsonlError {
    /// Whether the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, JsonlError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UtilizationRecord;

    const CAPTURE: &str = r#"{"timestamp": "2025-01-01T10:00:00Z", "node": "db-0", "memory_usage_bytes": 1048576, "cpu_usage_percent": 12.5}

{"timestamp": "2025-01-01T10:00:01Z", "node": "db-1", "memory_usage_bytes": 2097152, "cpu_usage_percent": 7.0}
{"timestamp": "2025-01-01T10:00:02Z", "node": "db-0", "memory_usage_by"#;

    #[test]
    fn test_should_parse_jsonl() {
        let result: JsonlDocument<UtilizationRecord> = JsonlReader::lenient()
            .parse(CAPTURE.as_bytes())
            .expect("Failed to parse capture");
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.records[1].node.as_deref(), Some("db-1"));
    }

    #[test]
    fn test_should_fail_parsing_on_invalid_jsonl_when_strict() {
        let result: Result<JsonlDocument<UtilizationRecord>, _> =
            JsonlReader::default().parse(CAPTURE.as_bytes());
        assert!(matches!(result, Err(JsonlError::Serde(_))));
    }
}
