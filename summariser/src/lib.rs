use crate::layout::BenchmarkLayout;
use crate::model::{BatchReport, Diagnostics};
use crate::scenario::{BenchmarkConfig, ScenarioVariant};

mod aggregator;
mod analyze;
pub mod downtime;
pub mod layout;
pub mod migration;
pub mod model;
pub mod normalize;
pub mod scenario;
pub mod utilization;

/// Summarize the whole experiment: one row per configured (scenario, variant).
///
/// Scenarios are independent and processed concurrently. No failure in one
/// scenario or run aborts the others; the batch always completes and reports
/// best-effort results, with anything incomplete carried as the missing
/// sentinel and counted in [`Diagnostics`].
pub async fn summarize_benchmark(
    layout: &BenchmarkLayout,
    config: &BenchmarkConfig,
) -> BatchReport {
    let jobs = config.scenarios().into_iter().flat_map(|key| {
        ScenarioVariant::ALL.map(|variant| {
            aggregator::process_scenario(layout, config, key.clone(), variant)
        })
    });

    let scenarios = futures::future::join_all(jobs).await;
    let diagnostics = Diagnostics::collect(&scenarios);

    BatchReport {
        scenarios,
        diagnostics,
    }
}
