use crate::model::UtilizationSample;
use chrono::{DateTime, Utc};
use migbench_result_model::{parse_record_timestamp, UtilizationRecord};
use std::collections::BTreeMap;

/// Samples past this many seconds after run start are collector stragglers
/// and are dropped.
const ALIGNMENT_HORIZON_SECS: i64 = 600;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// One run's utilization capture, bucketed to whole seconds and summed
/// across the reporting nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUtilization {
    pub memory_mb: Vec<UtilizationSample>,
    pub cpu_percent: Vec<UtilizationSample>,
    /// Records dropped for an unparseable timestamp, a missing value pair, or
    /// falling outside the horizon.
    pub dropped: usize,
}

impl RunUtilization {
    pub fn is_empty(&self) -> bool {
        self.memory_mb.is_empty() && self.cpu_percent.is_empty()
    }
}

/// Align one run's raw records into per-second cluster series.
///
/// The time index is `ceil(timestamp - run_start)` in whole seconds: a sample
/// arriving 0.3s into the run is attributed to second 1, one arriving exactly
/// on a second boundary keeps that second. Nodes report independently; all
/// values landing in the same second are summed into one cluster value.
/// Run start is the earliest parseable timestamp in the capture.
pub fn align_run(records: &[UtilizationRecord]) -> RunUtilization {
    let mut dropped = 0;

    let timestamped: Vec<(DateTime<Utc>, &UtilizationRecord)> = records
        .iter()
        .filter_map(|record| match parse_record_timestamp(&record.timestamp) {
            Some(timestamp) => Some((timestamp, record)),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    let Some(run_start) = timestamped.iter().map(|(timestamp, _)| *timestamp).min() else {
        return RunUtilization {
            dropped,
            ..Default::default()
        };
    };

    let mut memory: BTreeMap<i64, f64> = BTreeMap::new();
    let mut cpu: BTreeMap<i64, f64> = BTreeMap::new();

    for (timestamp, record) in timestamped {
        let elapsed_ms = (timestamp - run_start).num_milliseconds();
        let time_index = (elapsed_ms as f64 / 1000.0).ceil() as i64;
        if time_index > ALIGNMENT_HORIZON_SECS {
            dropped += 1;
            continue;
        }

        if record.memory_usage_bytes.is_none() && record.cpu_usage_percent.is_none() {
            dropped += 1;
            continue;
        }
        if let Some(bytes) = record.memory_usage_bytes {
            *memory.entry(time_index).or_default() += bytes / BYTES_PER_MEGABYTE;
        }
        if let Some(percent) = record.cpu_usage_percent {
            *cpu.entry(time_index).or_default() += percent;
        }
    }

    RunUtilization {
        memory_mb: to_samples(memory),
        cpu_percent: to_samples(cpu),
        dropped,
    }
}

fn to_samples(buckets: BTreeMap<i64, f64>) -> Vec<UtilizationSample> {
    buckets
        .into_iter()
        .map(|(time_index, cluster_value)| UtilizationSample {
            time_index,
            cluster_value,
        })
        .collect()
}

/// Combine the replicate runs of one (scenario, role) pair: truncate every
/// series to the shortest run's sample count, then take the arithmetic mean
/// position by position. Runs that produced no samples are ignored entirely;
/// with nothing left there is no series (`None`), not a zero-filled one.
pub fn average_series(runs: Vec<Vec<UtilizationSample>>) -> Option<Vec<UtilizationSample>> {
    let runs: Vec<Vec<UtilizationSample>> =
        runs.into_iter().filter(|run| !run.is_empty()).collect();
    if runs.is_empty() {
        return None;
    }

    let shortest = runs.iter().map(Vec::len).min()?;
    let averaged = (0..shortest)
        .map(|position| {
            let sum: f64 = runs.iter().map(|run| run[position].cluster_value).sum();
            UtilizationSample {
                time_index: runs[0][position].time_index,
                cluster_value: sum / runs.len() as f64,
            }
        })
        .collect();
    Some(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(timestamp: &str, node: &str, memory: f64, cpu: f64) -> UtilizationRecord {
        UtilizationRecord {
            timestamp: timestamp.to_string(),
            node: Some(node.to_string()),
            memory_usage_bytes: Some(memory),
            cpu_usage_percent: Some(cpu),
        }
    }

    #[test]
    fn test_ceiling_time_bucketing() {
        let records = vec![
            record("2025-01-01T10:00:00.000Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            // 0.3s into the run belongs to second 1
            record("2025-01-01T10:00:00.300Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            // 10.01s elapsed rounds up to 11
            record("2025-01-01T10:00:10.010Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            // exactly 10.00s stays at 10
            record("2025-01-01T10:00:10.000Z", "db-1", BYTES_PER_MEGABYTE, 1.0),
        ];

        let aligned = align_run(&records);
        let indices: Vec<i64> = aligned.memory_mb.iter().map(|s| s.time_index).collect();
        assert_eq!(indices, vec![0, 1, 10, 11]);
    }

    #[test]
    fn test_nodes_reporting_in_the_same_second_are_summed() {
        let records = vec![
            record("2025-01-01T10:00:00.000Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            record("2025-01-01T10:00:00.400Z", "db-0", 2.0 * BYTES_PER_MEGABYTE, 10.0),
            record("2025-01-01T10:00:00.600Z", "db-1", 3.0 * BYTES_PER_MEGABYTE, 20.0),
        ];

        let aligned = align_run(&records);
        assert_eq!(aligned.memory_mb.len(), 2);
        assert_eq!(aligned.memory_mb[1].time_index, 1);
        assert_eq!(aligned.memory_mb[1].cluster_value, 5.0);
        assert_eq!(aligned.cpu_percent[1].cluster_value, 30.0);
    }

    #[test]
    fn test_samples_beyond_horizon_are_dropped() {
        let records = vec![
            record("2025-01-01T10:00:00Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            record("2025-01-01T10:10:00Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            record("2025-01-01T10:10:00.500Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
        ];

        let aligned = align_run(&records);
        // 600s is inside the horizon, 600.5s is not
        assert_eq!(aligned.memory_mb.len(), 2);
        assert_eq!(aligned.dropped, 1);
    }

    #[test]
    fn test_unparseable_records_are_dropped_not_fatal() {
        let records = vec![
            record("2025-01-01T10:00:00Z", "db-0", BYTES_PER_MEGABYTE, 1.0),
            UtilizationRecord {
                timestamp: "???".to_string(),
                node: None,
                memory_usage_bytes: Some(1.0),
                cpu_usage_percent: None,
            },
            UtilizationRecord {
                timestamp: "2025-01-01T10:00:01Z".to_string(),
                node: Some("db-0".to_string()),
                memory_usage_bytes: None,
                cpu_usage_percent: None,
            },
        ];

        let aligned = align_run(&records);
        assert_eq!(aligned.memory_mb.len(), 1);
        assert_eq!(aligned.dropped, 2);
    }

    #[test]
    fn test_empty_capture_produces_no_series() {
        assert!(align_run(&[]).is_empty());
    }

    #[test]
    fn test_average_truncates_to_shortest_run() {
        let run = |len: usize, value: f64| -> Vec<UtilizationSample> {
            (0..len)
                .map(|i| UtilizationSample {
                    time_index: i as i64,
                    cluster_value: value,
                })
                .collect()
        };

        let averaged = average_series(vec![run(598, 1.0), run(600, 2.0), run(599, 3.0)]).unwrap();
        assert_eq!(averaged.len(), 598);
        assert_eq!(averaged[0].cluster_value, 2.0);
    }

    #[test]
    fn test_average_ignores_empty_runs() {
        let run: Vec<UtilizationSample> = vec![UtilizationSample {
            time_index: 0,
            cluster_value: 4.0,
        }];

        let averaged = average_series(vec![vec![], run]).unwrap();
        assert_eq!(averaged.len(), 1);
        assert_eq!(averaged[0].cluster_value, 4.0);
    }

    #[test]
    fn test_average_of_nothing_is_absent() {
        assert_eq!(average_series(vec![]), None);
        assert_eq!(average_series(vec![vec![], vec![]]), None);
    }
}
