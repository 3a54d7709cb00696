use crate::layout::BenchmarkLayout;
use crate::model::{
    AveragedSeries, MetricStats, ProcessingOutcome, RunMetrics, ScenarioMetrics, ScenarioReport,
    ScenarioSummary, UtilizationKind,
};
use crate::scenario::{BenchmarkConfig, ClusterRole, ScenarioKey, ScenarioVariant};
use crate::{analyze, downtime, migration, normalize, utilization};
use migbench_result_model::jsonl::JsonlReader;
use migbench_result_model::{RawRunResult, StateSnapshot, UtilizationRecord};

/// Everything derived from one run slot.
#[derive(Debug, Clone)]
struct RunSlot {
    metrics: Option<RunMetrics>,
    outcome: ProcessingOutcome,
}

impl RunSlot {
    fn unusable(outcome: ProcessingOutcome) -> Self {
        Self {
            metrics: None,
            outcome,
        }
    }
}

/// Process one (scenario, variant) from PENDING to its terminal state.
///
/// Excluded scenarios short-circuit to MISSING without any file reads. For
/// the rest, the run slots are independent and processed concurrently; the
/// aggregation below the join is the barrier that decides COMPLETE (all
/// required slots valid) versus MISSING.
pub(crate) async fn process_scenario(
    layout: &BenchmarkLayout,
    config: &BenchmarkConfig,
    key: ScenarioKey,
    variant: ScenarioVariant,
) -> ScenarioReport {
    let forwarding_tool = key.forwarding_tool().to_string();

    if config.is_excluded(&key) {
        log::debug!("Scenario {key} ({variant}) is excluded by configuration");
        return ScenarioReport {
            summary: ScenarioSummary {
                key,
                variant,
                forwarding_tool,
                metrics: None,
                run_outcomes: Vec::new(),
            },
            utilization: Vec::new(),
        };
    }

    let slots = futures::future::join_all(
        (1..=config.required_runs).map(|run_index| process_run(layout, &key, variant, run_index)),
    )
    .await;

    let run_outcomes: Vec<ProcessingOutcome> =
        slots.iter().map(|slot| slot.outcome.clone()).collect();

    let runs: Vec<RunMetrics> = slots.into_iter().filter_map(|slot| slot.metrics).collect();
    let metrics = if runs.len() == config.required_runs {
        match summarize_runs(&runs, variant) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                log::error!("Failed to aggregate {key} ({variant}): {e:?}");
                None
            }
        }
    } else {
        log::info!(
            "Scenario {key} ({variant}) is missing: {} of {} runs valid",
            runs.len(),
            config.required_runs
        );
        None
    };

    let utilization = if variant.is_idle() {
        Vec::new()
    } else {
        averaged_utilization(layout, config, &key)
    };

    ScenarioReport {
        summary: ScenarioSummary {
            key,
            variant,
            forwarding_tool,
            metrics,
            run_outcomes,
        },
        utilization,
    }
}

/// Process one run slot: load and normalize the result document, resolve
/// POST success against the persisted-state snapshot, and derive the run's
/// scalars. Failures here only cost this slot, never the scenario's siblings.
async fn process_run(
    layout: &BenchmarkLayout,
    key: &ScenarioKey,
    variant: ScenarioVariant,
    run_index: usize,
) -> RunSlot {
    let result_path = layout.result_file(key, variant, run_index);
    let raw = match RawRunResult::load(&result_path) {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => {
            log::debug!("No result file at {}", result_path.display());
            return RunSlot::unusable(ProcessingOutcome::Absent);
        }
        Err(e) => {
            log::warn!("Excluding run {run_index} of {key} ({variant}): {e}");
            return RunSlot::unusable(ProcessingOutcome::Excluded {
                reason: e.to_string(),
            });
        }
    };

    let snapshot_path = layout.snapshot_file(key, variant, run_index);
    let snapshot = match StateSnapshot::load(&snapshot_path) {
        Ok(snapshot) => Some(snapshot),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            log::warn!(
                "Ignoring unreadable snapshot {}: {e}",
                snapshot_path.display()
            );
            None
        }
    };

    let normalized = normalize::normalize_run(&raw, snapshot.as_ref());
    let counters = normalized.counters;

    let availability_percent = if counters.total_requests() == 0 {
        0.0
    } else {
        100.0 * counters.successful_requests() as f64 / counters.total_requests() as f64
    };
    let message_loss_percent = if counters.total_posts() == 0 {
        0.0
    } else {
        100.0 * counters.failed_posts as f64 / counters.total_posts() as f64
    };

    let mut outcome = ProcessingOutcome::Ok;
    let downtime_seconds = if variant.is_idle() {
        None
    } else if normalized.per_event_detail {
        let periods = downtime::failure_periods(&normalized.events);
        Some(downtime::total_downtime_seconds(&periods))
    } else {
        // aggregate counters only; the estimate is labeled as such
        outcome = ProcessingOutcome::Estimated;
        downtime::estimate_downtime_seconds(&normalized.events, &counters)
    };

    let migration_seconds = if variant.is_idle() {
        None
    } else {
        migration::migration_duration_seconds(layout.log_file(key, run_index))
    };

    RunSlot {
        metrics: Some(RunMetrics {
            successful_gets: counters.successful_gets,
            failed_gets: counters.failed_gets,
            successful_posts: counters.successful_posts,
            failed_posts: counters.failed_posts,
            availability_percent,
            message_loss_percent,
            mean_get_response_ms: normalized.mean_get_response_ms,
            mean_post_response_ms: normalized.mean_post_response_ms,
            downtime_seconds,
            migration_seconds,
        }),
        outcome,
    }
}

/// Mean/std across the required runs. Counts round to 1 decimal for the mean
/// and 2 for the std; percentages and times round to 2 for both.
fn summarize_runs(
    runs: &[RunMetrics],
    variant: ScenarioVariant,
) -> anyhow::Result<ScenarioMetrics> {
    let count = |extract: fn(&RunMetrics) -> u64| -> anyhow::Result<MetricStats> {
        let values: Vec<f64> = runs.iter().map(|run| extract(run) as f64).collect();
        analyze::replicate_stats(&values, 1, 2)
    };
    let scalar = |extract: fn(&RunMetrics) -> f64| -> anyhow::Result<MetricStats> {
        let values: Vec<f64> = runs.iter().map(extract).collect();
        analyze::replicate_stats(&values, 2, 2)
    };
    // Only aggregated when every run measured a value; a slot that produced
    // metrics but no duration leaves the whole field unmeasured.
    let optional = |extract: fn(&RunMetrics) -> Option<f64>| -> anyhow::Result<Option<MetricStats>> {
        let values: Vec<f64> = runs.iter().filter_map(extract).collect();
        if values.len() != runs.len() {
            return Ok(None);
        }
        Ok(Some(analyze::replicate_stats(&values, 2, 2)?))
    };

    Ok(ScenarioMetrics {
        successful_gets: count(|run| run.successful_gets)?,
        failed_gets: count(|run| run.failed_gets)?,
        successful_posts: count(|run| run.successful_posts)?,
        failed_posts: count(|run| run.failed_posts)?,
        availability_percent: scalar(|run| run.availability_percent)?,
        message_loss_percent: scalar(|run| run.message_loss_percent)?,
        mean_get_response_ms: scalar(|run| run.mean_get_response_ms)?,
        mean_post_response_ms: scalar(|run| run.mean_post_response_ms)?,
        downtime_seconds: if variant.is_idle() {
            None
        } else {
            optional(|run| run.downtime_seconds)?
        },
        migration_seconds: if variant.is_idle() {
            None
        } else {
            optional(|run| run.migration_seconds)?
        },
    })
}

/// Read, align and average the utilization captures for both cluster roles.
/// A role where no run produced a usable capture is simply absent.
fn averaged_utilization(
    layout: &BenchmarkLayout,
    config: &BenchmarkConfig,
    key: &ScenarioKey,
) -> Vec<AveragedSeries> {
    let mut series = Vec::new();

    for role in ClusterRole::ALL {
        let mut memory_runs = Vec::new();
        let mut cpu_runs = Vec::new();

        for run_index in 1..=config.required_runs {
            let path = layout.utilization_file(key, role, run_index);
            let document = match JsonlReader::lenient().parse_from_file::<_, UtilizationRecord>(&path)
            {
                Ok(document) => document,
                Err(e) if e.is_not_found() => {
                    log::debug!("No utilization capture at {}", path.display());
                    continue;
                }
                Err(e) => {
                    log::warn!("Skipping utilization capture {}: {e}", path.display());
                    continue;
                }
            };
            if document.skipped > 0 {
                log::debug!(
                    "Dropped {} invalid lines from {}",
                    document.skipped,
                    path.display()
                );
            }

            let aligned = utilization::align_run(&document.records);
            if aligned.dropped > 0 {
                log::debug!(
                    "Dropped {} unusable samples from {}",
                    aligned.dropped,
                    path.display()
                );
            }
            memory_runs.push(aligned.memory_mb);
            cpu_runs.push(aligned.cpu_percent);
        }

        if let Some(samples) = utilization::average_series(memory_runs) {
            series.push(AveragedSeries {
                role,
                kind: UtilizationKind::MemoryMb,
                samples,
            });
        }
        if let Some(samples) = utilization::average_series(cpu_runs) {
            series.push(AveragedSeries {
                role,
                kind: UtilizationKind::CpuPercent,
                samples,
            });
        }
    }

    series
}
