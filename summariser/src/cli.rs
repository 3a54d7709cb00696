use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct CliArgs {
    /// Directory containing the per-scenario result directories.
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// TOML file describing the scenario matrix. Defaults to the built-in
    /// experiment matrix when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path for the JSON report. Defaults to a timestamped file name in the
    /// working directory.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip printing the summary table to stdout.
    #[arg(long)]
    pub no_table: bool,
}
