use crate::model::MetricStats;
use anyhow::Context;
use polars::prelude::*;

/// Mean and sample standard deviation (n - 1 denominator) across the
/// replicate runs of one metric, rounded to the given number of decimals.
pub(crate) fn replicate_stats(
    values: &[f64],
    mean_decimals: u32,
    std_decimals: u32,
) -> anyhow::Result<MetricStats> {
    let frame = df!["value" => values.to_vec()]?;
    let value_series = frame.column("value")?.clone();

    let mean = value_series.mean().context("Mean")?;
    let std = value_series.std(1).context("Std")?;

    Ok(MetricStats {
        mean: round_to(mean, mean_decimals),
        std: round_to(std, std_decimals),
    })
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
