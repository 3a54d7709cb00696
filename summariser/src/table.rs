use migbench_summariser::model::{BatchReport, MetricStats, ScenarioReport};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Placeholder for scenarios that did not reach COMPLETE. Missing is always
/// rendered as a placeholder, never as zero.
const MISSING: &str = "-";

#[derive(Tabled)]
pub struct SummaryRow {
    pub scenario: String,
    pub variant: String,
    pub forwarding: String,
    pub availability_pct: String,
    pub loss_pct: String,
    pub downtime_s: String,
    pub migration_s: String,
    pub get_ms: String,
    pub post_ms: String,
}

impl From<&ScenarioReport> for SummaryRow {
    fn from(report: &ScenarioReport) -> Self {
        let summary = &report.summary;
        let metrics = summary.metrics.as_ref();

        SummaryRow {
            scenario: summary.key.to_string(),
            variant: summary.variant.to_string(),
            forwarding: summary.forwarding_tool.clone(),
            availability_pct: stat_cell(metrics.map(|m| &m.availability_percent)),
            loss_pct: stat_cell(metrics.map(|m| &m.message_loss_percent)),
            downtime_s: stat_cell(metrics.and_then(|m| m.downtime_seconds.as_ref())),
            migration_s: stat_cell(metrics.and_then(|m| m.migration_seconds.as_ref())),
            get_ms: stat_cell(metrics.map(|m| &m.mean_get_response_ms)),
            post_ms: stat_cell(metrics.map(|m| &m.mean_post_response_ms)),
        }
    }
}

fn stat_cell(stats: Option<&MetricStats>) -> String {
    match stats {
        Some(stats) => format!("{:.2} ± {:.2}", stats.mean, stats.std),
        None => MISSING.to_string(),
    }
}

pub fn print_summary_table(report: &BatchReport) {
    let rows: Vec<SummaryRow> = report.scenarios.iter().map(SummaryRow::from).collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());

    println!("{}", table);
}
