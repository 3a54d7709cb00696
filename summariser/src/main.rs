use anyhow::Context;
use chrono::Utc;
use clap::Parser as _;
use log::debug;
use migbench_summariser::layout::BenchmarkLayout;
use migbench_summariser::scenario::BenchmarkConfig;
use std::fs::File;
use std::path::PathBuf;

mod cli;
mod table;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli::CliArgs::try_parse()?;

    let config = match &args.config {
        Some(path) => BenchmarkConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BenchmarkConfig::default(),
    };
    let layout = BenchmarkLayout::new(&args.results_dir);
    debug!(
        "Summarizing {} scenarios under {}",
        config.scenarios().len(),
        layout.results_dir().display()
    );

    let report = migbench_summariser::summarize_benchmark(&layout, &config).await;

    if !args.no_table {
        table::print_summary_table(&report);
    }

    let output_path = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "summariser-report-{}.json",
            Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
        ))
    });
    let output = File::create_new(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    serde_json::to_writer_pretty(output, &report)?;
    log::info!("Report written to {}", output_path.display());

    let diagnostics = &report.diagnostics;
    log::info!(
        "Processed {} runs ({} estimated, {} absent, {} excluded); {} scenarios missing, {} excluded, {} migrations unmeasured",
        diagnostics.runs_processed,
        diagnostics.runs_estimated,
        diagnostics.runs_absent,
        diagnostics.runs_excluded,
        diagnostics.scenarios_missing,
        diagnostics.scenarios_excluded,
        diagnostics.migrations_unmeasured,
    );

    Ok(())
}
