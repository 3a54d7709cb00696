use crate::scenario::{ClusterRole, ScenarioKey, ScenarioVariant};
use std::path::{Path, PathBuf};

/// Where the benchmark client left its files.
///
/// All path construction goes through this struct so that callers (and tests)
/// can point the engine at any directory tree; nothing in the engine touches
/// global path state.
///
/// Per scenario directory the client writes, for run index `i` starting at 1:
/// - `run<i>.json` / `idle_run<i>.json` — the result document
/// - `run<i>_snapshot.json` / `idle_run<i>_snapshot.json` — persisted-state
///   ground truth
/// - `run<i>.log` — server log, migration runs only
/// - `run<i>_<role>.jsonl` — utilization capture per cluster role
#[derive(Debug, Clone)]
pub struct BenchmarkLayout {
    results_dir: PathBuf,
}

impl BenchmarkLayout {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn scenario_dir(&self, key: &ScenarioKey) -> PathBuf {
        self.results_dir.join(key.dir_name())
    }

    fn run_stem(variant: ScenarioVariant, run_index: usize) -> String {
        match variant {
            ScenarioVariant::Migration => format!("run{run_index}"),
            ScenarioVariant::Idle => format!("idle_run{run_index}"),
        }
    }

    pub fn result_file(
        &self,
        key: &ScenarioKey,
        variant: ScenarioVariant,
        run_index: usize,
    ) -> PathBuf {
        self.scenario_dir(key)
            .join(format!("{}.json", Self::run_stem(variant, run_index)))
    }

    pub fn snapshot_file(
        &self,
        key: &ScenarioKey,
        variant: ScenarioVariant,
        run_index: usize,
    ) -> PathBuf {
        self.scenario_dir(key)
            .join(format!("{}_snapshot.json", Self::run_stem(variant, run_index)))
    }

    /// Server log carrying the migration markers. Idle runs have none.
    pub fn log_file(&self, key: &ScenarioKey, run_index: usize) -> PathBuf {
        self.scenario_dir(key).join(format!("run{run_index}.log"))
    }

    pub fn utilization_file(
        &self,
        key: &ScenarioKey,
        role: ClusterRole,
        run_index: usize,
    ) -> PathBuf {
        self.scenario_dir(key)
            .join(format!("run{run_index}_{role}.jsonl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::test_key;

    #[test]
    fn test_layout_paths() {
        let layout = BenchmarkLayout::new("/data/results");
        let key = test_key();

        assert_eq!(
            layout.result_file(&key, ScenarioVariant::Migration, 2),
            PathBuf::from("/data/results/skupper_postgres_multi_cluster_dns/run2.json")
        );
        assert_eq!(
            layout.result_file(&key, ScenarioVariant::Idle, 1),
            PathBuf::from("/data/results/skupper_postgres_multi_cluster_dns/idle_run1.json")
        );
        assert_eq!(
            layout.snapshot_file(&key, ScenarioVariant::Migration, 3),
            PathBuf::from("/data/results/skupper_postgres_multi_cluster_dns/run3_snapshot.json")
        );
        assert_eq!(
            layout.log_file(&key, 1),
            PathBuf::from("/data/results/skupper_postgres_multi_cluster_dns/run1.log")
        );
        assert_eq!(
            layout.utilization_file(&key, ClusterRole::Target, 1),
            PathBuf::from("/data/results/skupper_postgres_multi_cluster_dns/run1_target.jsonl")
        );
    }
}
