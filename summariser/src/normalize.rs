use chrono::{DateTime, Utc};
use migbench_result_model::{
    parse_record_timestamp, FlatRecord, NestedRecord, RawRunResult, StateSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn parse(value: &str) -> Option<Method> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// One request observation in canonical form.
///
/// `timestamp` is `None` when the wire value did not parse; the downtime
/// detector discards such events. `success` is `None` when the record shape
/// carries no per-event outcome (flattened input).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub method: Method,
    pub success: Option<bool>,
    pub content: Option<String>,
    pub response_time_ms: Option<f64>,
}

/// Run-level request totals, either counted from events (nested input) or
/// lifted from the aggregate columns (flattened input).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunCounters {
    pub successful_gets: u64,
    pub failed_gets: u64,
    pub successful_posts: u64,
    pub failed_posts: u64,
}

impl RunCounters {
    pub fn total_posts(&self) -> u64 {
        self.successful_posts + self.failed_posts
    }

    pub fn total_requests(&self) -> u64 {
        self.successful_gets + self.failed_gets + self.total_posts()
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_gets + self.successful_posts
    }
}

/// The normalizer's output for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRun {
    pub events: Vec<RequestEvent>,
    pub counters: RunCounters,
    /// True when per-event success detail exists; false routes the downtime
    /// detector to its aggregate-ratio fallback.
    pub per_event_detail: bool,
    pub mean_get_response_ms: f64,
    pub mean_post_response_ms: f64,
}

/// Normalize one run's shape-resolved result document into a uniform event
/// list plus the aggregate counters. Pure transform, no I/O.
///
/// POST success is resolved against the persisted-state `snapshot` when one
/// is available: a message counts as delivered only if its content (or, for
/// content-less messages, its record index) is present in the snapshot.
/// Without a snapshot the client-recorded flag is trusted.
pub fn normalize_run(raw: &RawRunResult, snapshot: Option<&StateSnapshot>) -> NormalizedRun {
    match raw {
        RawRunResult::Nested(records) => normalize_nested(records, snapshot),
        RawRunResult::Flattened(rows) => normalize_flattened(rows),
    }
}

fn normalize_nested(records: &[NestedRecord], snapshot: Option<&StateSnapshot>) -> NormalizedRun {
    let mut events = Vec::with_capacity(records.len());
    let mut counters = RunCounters::default();

    for (index, record) in records.iter().enumerate() {
        let Some(method) = Method::parse(&record.message.method) else {
            log::trace!("Discarding record with unknown method {:?}", record.message.method);
            continue;
        };

        let success = match (method, snapshot) {
            (Method::Post, Some(snapshot)) => {
                let identifier = record
                    .message
                    .content
                    .clone()
                    .unwrap_or_else(|| index.to_string());
                snapshot.contains(&identifier)
            }
            _ => record.success,
        };

        match (method, success) {
            (Method::Get, true) => counters.successful_gets += 1,
            (Method::Get, false) => counters.failed_gets += 1,
            (Method::Post, true) => counters.successful_posts += 1,
            (Method::Post, false) => counters.failed_posts += 1,
        }

        events.push(RequestEvent {
            timestamp: parse_record_timestamp(&record.message.timestamp),
            method,
            success: Some(success),
            content: record.message.content.clone(),
            response_time_ms: record.message.response_time_ms,
        });
    }

    let mean_get_response_ms = mean_response(&events, Method::Get);
    let mean_post_response_ms = mean_response(&events, Method::Post);

    NormalizedRun {
        events,
        counters,
        per_event_detail: true,
        mean_get_response_ms,
        mean_post_response_ms,
    }
}

fn normalize_flattened(rows: &[FlatRecord]) -> NormalizedRun {
    let mut events = Vec::with_capacity(rows.len());

    // The counter columns repeat the run totals on every row; taking the
    // maximum also tolerates clients that flush the counters incrementally.
    let mut counters = RunCounters::default();
    let mut total_response_ms: Option<f64> = None;

    for row in rows {
        let Some(method) = Method::parse(&row.method) else {
            log::trace!("Discarding row with unknown method {:?}", row.method);
            continue;
        };

        counters.successful_posts = counters.successful_posts.max(row.successful_posts.unwrap_or(0));
        counters.failed_posts = counters.failed_posts.max(row.failed_posts.unwrap_or(0));
        counters.successful_gets = counters.successful_gets.max(row.successful_gets.unwrap_or(0));
        counters.failed_gets = counters.failed_gets.max(row.failed_gets.unwrap_or(0));
        if let Some(total) = row.total_response_time_ms {
            total_response_ms = Some(total_response_ms.unwrap_or(0.0).max(total));
        }

        events.push(RequestEvent {
            timestamp: parse_record_timestamp(&row.timestamp),
            method,
            success: None,
            content: None,
            response_time_ms: row.response_time_ms,
        });
    }

    let mut mean_get_response_ms = mean_response(&events, Method::Get);
    let mut mean_post_response_ms = mean_response(&events, Method::Post);

    // Older flattened exports only carry the accumulated total; spread it
    // over all requests since there is no per-method breakdown.
    if mean_get_response_ms == 0.0 && mean_post_response_ms == 0.0 {
        if let Some(total) = total_response_ms {
            let requests = counters.total_requests();
            if requests > 0 {
                let mean = total / requests as f64;
                mean_get_response_ms = mean;
                mean_post_response_ms = mean;
            }
        }
    }

    NormalizedRun {
        events,
        counters,
        per_event_detail: false,
        mean_get_response_ms,
        mean_post_response_ms,
    }
}

fn mean_response(events: &[RequestEvent], method: Method) -> f64 {
    let times: Vec<f64> = events
        .iter()
        .filter(|e| e.method == method)
        .filter_map(|e| e.response_time_ms)
        .collect();
    if times.is_empty() {
        return 0.0;
    }
    times.iter().sum::<f64>() / times.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use migbench_result_model::{RawMessage, StateSnapshot};
    use pretty_assertions::assert_eq;

    fn nested_post(content: &str, recorded_success: bool) -> NestedRecord {
        NestedRecord {
            message: RawMessage {
                method: "POST".to_string(),
                timestamp: "2025-01-01T10:00:00Z".to_string(),
                content: Some(content.to_string()),
                response_time_ms: Some(10.0),
            },
            success: recorded_success,
        }
    }

    #[test]
    fn test_post_success_is_resolved_from_snapshot_not_recorded_flag() {
        // recorded as successful, but absent from the persisted state
        let raw = RawRunResult::Nested(vec![
            nested_post("msg-1", true),
            nested_post("msg-2", true),
        ]);
        let snapshot = StateSnapshot::from_contents(["msg-1"]);

        let normalized = normalize_run(&raw, Some(&snapshot));
        assert_eq!(normalized.counters.successful_posts, 1);
        assert_eq!(normalized.counters.failed_posts, 1);
        assert_eq!(normalized.events[1].success, Some(false));
    }

    #[test]
    fn test_recorded_flag_is_used_without_snapshot() {
        let raw = RawRunResult::Nested(vec![nested_post("msg-1", false)]);
        let normalized = normalize_run(&raw, None);
        assert_eq!(normalized.counters.failed_posts, 1);
    }

    #[test]
    fn test_contentless_post_falls_back_to_record_index() {
        let mut record = nested_post("unused", true);
        record.message.content = None;
        let raw = RawRunResult::Nested(vec![record]);

        // index 0 is persisted
        let snapshot = StateSnapshot::from_contents(["0"]);
        let normalized = normalize_run(&raw, Some(&snapshot));
        assert_eq!(normalized.counters.successful_posts, 1);
    }

    #[test]
    fn test_unknown_methods_are_discarded() {
        let raw = RawRunResult::Nested(vec![NestedRecord {
            message: RawMessage {
                method: "PUT".to_string(),
                timestamp: "2025-01-01T10:00:00Z".to_string(),
                content: None,
                response_time_ms: None,
            },
            success: true,
        }]);
        let normalized = normalize_run(&raw, None);
        assert!(normalized.events.is_empty());
        assert_eq!(normalized.counters.total_requests(), 0);
    }

    #[test]
    fn test_flattened_counters_are_lifted_from_aggregate_columns() {
        let rows = vec![
            FlatRecord {
                method: "GET".to_string(),
                timestamp: "2025-01-01T10:00:00Z".to_string(),
                successful_posts: Some(500),
                failed_posts: Some(2),
                successful_gets: Some(498),
                failed_gets: Some(0),
                response_time_ms: None,
                total_response_time_ms: Some(5000.0),
            },
            FlatRecord {
                method: "POST".to_string(),
                timestamp: "2025-01-01T10:00:01Z".to_string(),
                successful_posts: Some(500),
                failed_posts: Some(2),
                successful_gets: Some(498),
                failed_gets: Some(0),
                response_time_ms: None,
                total_response_time_ms: Some(5000.0),
            },
        ];
        let normalized = normalize_run(&RawRunResult::Flattened(rows), None);

        assert!(!normalized.per_event_detail);
        assert_eq!(normalized.counters.successful_posts, 500);
        assert_eq!(normalized.counters.total_requests(), 1000);
        // 5000ms over 1000 requests
        assert_eq!(normalized.mean_get_response_ms, 5.0);
        assert_eq!(normalized.mean_post_response_ms, 5.0);
    }

    #[test]
    fn test_unparseable_timestamp_survives_normalization_as_none() {
        let mut record = nested_post("msg-1", true);
        record.message.timestamp = "not a time".to_string();
        let normalized = normalize_run(&RawRunResult::Nested(vec![record]), None);
        assert_eq!(normalized.events.len(), 1);
        assert!(normalized.events[0].timestamp.is_none());
    }
}
