use crate::scenario::{ClusterRole, ScenarioKey, ScenarioVariant};
use serde::{Deserialize, Serialize};

/// A `(mean, std)` pair for one metric across the replicate runs of a
/// scenario. Standard deviation is the sample standard deviation (n - 1
/// denominator). Both values are rounded when the pair is built, see
/// [`crate::analyze::replicate_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std: f64,
}

/// The scalars derived from a single run.
///
/// `downtime_seconds` and `migration_seconds` are `None` for idle-baseline
/// runs. `migration_seconds` is also `None` when the run's log file is
/// missing or carries no usable markers; that is "not measured", never 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub successful_gets: u64,
    pub failed_gets: u64,
    pub successful_posts: u64,
    pub failed_posts: u64,
    pub availability_percent: f64,
    pub message_loss_percent: f64,
    pub mean_get_response_ms: f64,
    pub mean_post_response_ms: f64,
    pub downtime_seconds: Option<f64>,
    pub migration_seconds: Option<f64>,
}

/// How one run slot was processed.
///
/// Carried in the report next to the metrics so callers and tests can assert
/// on the path taken instead of parsing log output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOutcome {
    /// Per-event detail was available and used.
    Ok,
    /// Flattened input: downtime is the aggregate-ratio approximation.
    Estimated,
    /// The result file does not exist.
    Absent,
    /// The result file exists but the run could not be used.
    Excluded { reason: String },
}

impl ProcessingOutcome {
    pub fn is_usable(&self) -> bool {
        matches!(self, ProcessingOutcome::Ok | ProcessingOutcome::Estimated)
    }
}

/// Mean/std pairs for every metric of a scenario that reached COMPLETE.
///
/// `downtime_seconds`/`migration_seconds` are `None` for idle baselines, and
/// `migration_seconds` is `None` when not all runs measured a duration; the
/// remaining metrics still stand in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub successful_gets: MetricStats,
    pub failed_gets: MetricStats,
    pub successful_posts: MetricStats,
    pub failed_posts: MetricStats,
    pub availability_percent: MetricStats,
    pub message_loss_percent: MetricStats,
    pub mean_get_response_ms: MetricStats,
    pub mean_post_response_ms: MetricStats,
    pub downtime_seconds: Option<MetricStats>,
    pub migration_seconds: Option<MetricStats>,
}

/// One row of the final output: a scenario and its aggregated metrics.
///
/// `metrics` is `Some` only when every required run produced valid
/// [`RunMetrics`]; otherwise it is `None`, the missing sentinel. There is no
/// partially populated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub key: ScenarioKey,
    pub variant: ScenarioVariant,
    pub forwarding_tool: String,
    pub metrics: Option<ScenarioMetrics>,
    /// Per-slot outcomes in run order. Empty when the scenario was excluded
    /// by configuration and no file was read.
    pub run_outcomes: Vec<ProcessingOutcome>,
}

/// One point of an aligned utilization series: whole seconds since run start
/// (ceiling-rounded) and the value summed across the cluster's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    pub time_index: i64,
    pub cluster_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationKind {
    MemoryMb,
    CpuPercent,
}

/// The element-wise mean of the replicate runs' series for one cluster role,
/// truncated to the shortest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedSeries {
    pub role: ClusterRole,
    pub kind: UtilizationKind,
    pub samples: Vec<UtilizationSample>,
}

/// Everything the engine produced for one (scenario, variant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub summary: ScenarioSummary,
    /// Averaged utilization series for plotting. Empty for idle baselines and
    /// for scenarios where no run produced a usable capture.
    pub utilization: Vec<AveragedSeries>,
}

/// Side-channel totals for the whole batch. These never appear in the metric
/// columns; the table renders missing scenarios with a placeholder instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub runs_processed: usize,
    pub runs_estimated: usize,
    pub runs_absent: usize,
    pub runs_excluded: usize,
    pub scenarios_missing: usize,
    pub scenarios_excluded: usize,
    pub migrations_unmeasured: usize,
}

impl Diagnostics {
    pub fn collect(scenarios: &[ScenarioReport]) -> Self {
        let mut totals = Diagnostics::default();
        for report in scenarios {
            let summary = &report.summary;
            if summary.run_outcomes.is_empty() {
                totals.scenarios_excluded += 1;
                continue;
            }
            for outcome in &summary.run_outcomes {
                match outcome {
                    ProcessingOutcome::Ok => totals.runs_processed += 1,
                    ProcessingOutcome::Estimated => {
                        totals.runs_processed += 1;
                        totals.runs_estimated += 1;
                    }
                    ProcessingOutcome::Absent => totals.runs_absent += 1,
                    ProcessingOutcome::Excluded { .. } => totals.runs_excluded += 1,
                }
            }
            match &summary.metrics {
                None => totals.scenarios_missing += 1,
                Some(metrics) => {
                    if summary.variant == ScenarioVariant::Migration
                        && metrics.migration_seconds.is_none()
                    {
                        totals.migrations_unmeasured += 1;
                    }
                }
            }
        }
        totals
    }
}

/// The full batch output: one [`ScenarioReport`] per configured
/// (scenario, variant) plus the diagnostics block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub scenarios: Vec<ScenarioReport>,
    pub diagnostics: Diagnostics,
}
