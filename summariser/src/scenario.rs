use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reroute selector value meaning "forward traffic through the connectivity
/// tool itself" instead of a dedicated migration tool.
pub const SELECTED_TOOL: &str = "selected_tool";

/// Identifies one experimental configuration.
///
/// `reroute_tool` is the configured selector; the effective forwarding tool
/// is resolved with [`ScenarioKey::forwarding_tool`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub database: String,
    pub topology: String,
    pub connectivity_tool: String,
    pub reroute_tool: String,
}

impl ScenarioKey {
    /// The traffic-rerouting mechanism actually under test: the connectivity
    /// tool's own name when the selector is [`SELECTED_TOOL`], otherwise the
    /// fixed tool named by the selector.
    pub fn forwarding_tool(&self) -> &str {
        if self.reroute_tool == SELECTED_TOOL {
            &self.connectivity_tool
        } else {
            &self.reroute_tool
        }
    }

    /// Directory name used by the benchmark client for this configuration.
    pub fn dir_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.connectivity_tool, self.database, self.topology, self.reroute_tool
        )
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.connectivity_tool, self.database, self.topology, self.reroute_tool
        )
    }
}

/// Whether a scenario's runs performed a migration or ran the idle baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioVariant {
    Migration,
    Idle,
}

impl ScenarioVariant {
    pub const ALL: [ScenarioVariant; 2] = [ScenarioVariant::Migration, ScenarioVariant::Idle];

    pub fn is_idle(&self) -> bool {
        matches!(self, ScenarioVariant::Idle)
    }
}

impl fmt::Display for ScenarioVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioVariant::Migration => write!(f, "migration"),
            ScenarioVariant::Idle => write!(f, "idle"),
        }
    }
}

/// Which side of the migration a utilization capture was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterRole {
    Origin,
    Target,
}

impl ClusterRole {
    pub const ALL: [ClusterRole; 2] = [ClusterRole::Origin, ClusterRole::Target];
}

impl fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterRole::Origin => write!(f, "origin"),
            ClusterRole::Target => write!(f, "target"),
        }
    }
}

/// Matches scenarios for exclusion. `None` fields match anything, so a filter
/// can name a single configuration or a whole family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reroute_tool: Option<String>,
}

impl ScenarioFilter {
    pub fn matches(&self, key: &ScenarioKey) -> bool {
        fn field(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }

        field(&self.database, &key.database)
            && field(&self.topology, &key.topology)
            && field(&self.connectivity_tool, &key.connectivity_tool)
            && field(&self.reroute_tool, &key.reroute_tool)
    }
}

/// The experiment matrix: which configurations to summarize and how many
/// replicate runs each one requires. Supplied by the caller, optionally from
/// a TOML file; the defaults document the matrix the experiment was run with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub databases: Vec<String>,
    pub topologies: Vec<String>,
    pub connectivity_tools: Vec<String>,
    pub reroute_tools: Vec<String>,
    /// A summary is only COMPLETE with exactly this many valid runs.
    pub required_runs: usize,
    /// Configurations that were never provisioned. These go straight to
    /// MISSING without touching the filesystem.
    pub excluded: Vec<ScenarioFilter>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            databases: vec!["postgres".to_string(), "mysql".to_string()],
            topologies: vec!["single_cluster".to_string(), "multi_cluster".to_string()],
            connectivity_tools: vec![
                "skupper".to_string(),
                "submariner".to_string(),
                "linkerd".to_string(),
            ],
            reroute_tools: vec!["dns".to_string(), SELECTED_TOOL.to_string()],
            required_runs: 3,
            // linkerd was never deployed against mysql across clusters
            excluded: vec![ScenarioFilter {
                database: Some("mysql".to_string()),
                topology: Some("multi_cluster".to_string()),
                connectivity_tool: Some("linkerd".to_string()),
                reroute_tool: None,
            }],
        }
    }
}

/// An error loading the scenario matrix.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid scenario matrix: {0}")]
    Parse(#[from] toml::de::Error),
}

impl BenchmarkConfig {
    /// Load the matrix from a TOML file. Missing keys fall back to the
    /// defaults, so a config file only has to name what differs.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Every configuration in the matrix, exclusions included. The aggregator
    /// consults [`BenchmarkConfig::is_excluded`] per key so that excluded
    /// scenarios still get their MISSING row in the output.
    pub fn scenarios(&self) -> Vec<ScenarioKey> {
        iproduct!(
            &self.connectivity_tools,
            &self.databases,
            &self.topologies,
            &self.reroute_tools
        )
        .map(|(connectivity_tool, database, topology, reroute_tool)| ScenarioKey {
            database: database.clone(),
            topology: topology.clone(),
            connectivity_tool: connectivity_tool.clone(),
            reroute_tool: reroute_tool.clone(),
        })
        .collect()
    }

    pub fn is_excluded(&self, key: &ScenarioKey) -> bool {
        self.excluded.iter().any(|filter| filter.matches(key))
    }
}

#[cfg(test)]
pub(crate) fn test_key() -> ScenarioKey {
    ScenarioKey {
        database: "postgres".to_string(),
        topology: "multi_cluster".to_string(),
        connectivity_tool: "skupper".to_string(),
        reroute_tool: "dns".to_string(),
    }
}
