//! Configuration loading and typed config structures for bulwark.
//!
//! The canonical configuration lives in `bulwark-config.yaml` next to the
//! engine binary. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every section and field has a default, so an empty file (or no file at
//! all) yields the reference 9x5 setup.

use std::collections::BTreeMap;
use std::path::Path;

use bulwark_types::{Cell, EmplacementKind, GridDims, KindProfile};
use serde::Deserialize;

use crate::catalog::Catalog;
use crate::collaborators::Loadout;

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "BULWARK_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an impossible setup.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulwarkConfig {
    /// Board dimensions.
    #[serde(default)]
    pub grid: GridConfig,

    /// Threat memory settings.
    #[serde(default)]
    pub threat: ThreatConfig,

    /// Decision ladder and phase machine parameters.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Budget and consumable settings.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Per-kind cost and delay overrides.
    #[serde(default)]
    pub kinds: BTreeMap<EmplacementKind, KindProfile>,

    /// Equipped kinds and their input slots.
    #[serde(default = "default_loadout")]
    pub loadout: Loadout,

    /// Control loop settings for the engine binary.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BulwarkConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            threat: ThreatConfig::default(),
            policy: PolicyConfig::default(),
            economy: EconomyConfig::default(),
            kinds: BTreeMap::new(),
            loadout: default_loadout(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BulwarkConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// `BULWARK_LOG` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Board dimensions.
    pub const fn dims(&self) -> GridDims {
        GridDims::new(self.grid.cols, self.grid.rows)
    }

    /// Catalog with the configured overrides applied.
    pub fn catalog(&self) -> Catalog {
        Catalog::with_overrides(self.kinds.clone())
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = self.dims();
        if dims.cols == 0 || dims.rows == 0 {
            return Err(invalid("grid must have at least one column and one row"));
        }

        let policy = &self.policy;
        for cell in policy.production_cells.iter().chain(&policy.expansion_cells) {
            if !dims.contains(*cell) {
                return Err(invalid(format!("producer cell {cell} lies outside the grid")));
            }
        }
        if let Some(row) = policy.shooter_rows.iter().find(|row| **row >= dims.rows) {
            return Err(invalid(format!("shooter row {row} lies outside the grid")));
        }
        if policy.shooter_rows.is_empty() {
            return Err(invalid("at least one shooter row is required"));
        }
        if policy.column_bands.is_empty() || policy.column_bands.iter().any(Vec::is_empty) {
            return Err(invalid("column bands must be non-empty"));
        }
        if let Some(col) = policy
            .column_bands
            .iter()
            .flatten()
            .find(|col| **col >= dims.cols)
        {
            return Err(invalid(format!("shooter column {col} lies outside the grid")));
        }
        if !self.loadout.has_unique_slots() {
            return Err(invalid("two loadout kinds share a slot"));
        }
        if policy.total_producer_quota < policy.production_quota {
            return Err(invalid(format!(
                "total_producer_quota ({}) is below production_quota ({})",
                policy.total_producer_quota, policy.production_quota
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_cols")]
    pub cols: u32,

    /// Number of rows.
    #[serde(default = "default_rows")]
    pub rows: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: default_cols(),
            rows: default_rows(),
        }
    }
}

/// Threat memory settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ThreatConfig {
    /// How long a row stays active after its last sighting.
    #[serde(default = "default_memory_window_ms")]
    pub memory_window_ms: u64,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            memory_window_ms: default_memory_window_ms(),
        }
    }
}

/// Decision ladder and phase machine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyConfig {
    /// Producer cells for the production phase, in priority order.
    #[serde(default = "default_production_cells")]
    pub production_cells: Vec<Cell>,

    /// Producer cells for the expansion phase, in priority order.
    #[serde(default = "default_expansion_cells")]
    pub expansion_cells: Vec<Cell>,

    /// Producers to place before building defense (N1).
    #[serde(default = "default_production_quota")]
    pub production_quota: u32,

    /// Producers wanted once expansion completes (N2).
    #[serde(default = "default_total_producer_quota")]
    pub total_producer_quota: u32,

    /// Budget at which expansion may start before the primary region fills.
    #[serde(default = "default_economy_threshold")]
    pub economy_threshold: u32,

    /// Rows shooters may be placed in, in preference order.
    #[serde(default = "default_shooter_rows")]
    pub shooter_rows: Vec<u32>,

    /// Shooter column bands, narrowest (primary) first.
    #[serde(default = "default_column_bands")]
    pub column_bands: Vec<Vec<u32>>,

    /// Shooters every shooter row needs before expansion may start.
    #[serde(default = "default_min_shooters_per_row")]
    pub min_shooters_per_row: u32,

    /// Budget below which no shooter is placed.
    #[serde(default = "default_min_budget_for_shooters")]
    pub min_budget_for_shooters: u32,

    /// Column distance between a threat and a shooter that triggers area
    /// damage (D1).
    #[serde(default = "default_proximity_distance")]
    pub proximity_distance: u32,

    /// Threats in one 3x3 neighbourhood that trigger area damage.
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: u32,

    /// Threat column at or below which instant kills are used.
    #[serde(default = "default_panic_column")]
    pub panic_column: u32,

    /// Threat column at or below which barriers are placed.
    #[serde(default = "default_defense_trigger_column")]
    pub defense_trigger_column: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            production_cells: default_production_cells(),
            expansion_cells: default_expansion_cells(),
            production_quota: default_production_quota(),
            total_producer_quota: default_total_producer_quota(),
            economy_threshold: default_economy_threshold(),
            shooter_rows: default_shooter_rows(),
            column_bands: default_column_bands(),
            min_shooters_per_row: default_min_shooters_per_row(),
            min_budget_for_shooters: default_min_budget_for_shooters(),
            proximity_distance: default_proximity_distance(),
            cluster_threshold: default_cluster_threshold(),
            panic_column: default_panic_column(),
            defense_trigger_column: default_defense_trigger_column(),
        }
    }
}

impl PolicyConfig {
    /// Every shooter column across all bands, ascending and deduplicated.
    pub fn allowed_columns(&self) -> Vec<u32> {
        let mut cols: Vec<u32> = self.column_bands.iter().flatten().copied().collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// Cells of the primary shooter region (shooter rows x first band).
    pub fn primary_region(&self) -> Vec<Cell> {
        let primary = self.column_bands.first().map(Vec::as_slice).unwrap_or_default();
        self.shooter_rows
            .iter()
            .flat_map(move |&row| primary.iter().map(move |&col| Cell::new(col, row)))
            .collect()
    }

    /// Producers the expansion phase adds on top of the production quota.
    pub const fn expansion_quota(&self) -> u32 {
        self.total_producer_quota.saturating_sub(self.production_quota)
    }
}

/// Budget and consumable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Balance at start and after a reset.
    #[serde(default = "default_initial_budget")]
    pub initial_budget: u32,

    /// Delay after which a used consumable is cleared from the board.
    #[serde(default = "default_consumable_clear_ms")]
    pub consumable_clear_ms: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            initial_budget: default_initial_budget(),
            consumable_clear_ms: default_consumable_clear_ms(),
        }
    }
}

/// Control loop settings for the engine binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks to run before stopping (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Seed for the sandbox environment.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            seed: default_seed(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Override the level with `BULWARK_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(LOG_LEVEL_ENV) {
            self.level = val;
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_cols() -> u32 {
    bulwark_types::grid::DEFAULT_COLS
}

const fn default_rows() -> u32 {
    bulwark_types::grid::DEFAULT_ROWS
}

const fn default_memory_window_ms() -> u64 {
    crate::threat::DEFAULT_MEMORY_WINDOW_MS
}

fn default_production_cells() -> Vec<Cell> {
    vec![Cell::new(0, 2), Cell::new(0, 1), Cell::new(0, 3)]
}

fn default_expansion_cells() -> Vec<Cell> {
    vec![Cell::new(0, 0), Cell::new(0, 4)]
}

const fn default_production_quota() -> u32 {
    3
}

const fn default_total_producer_quota() -> u32 {
    5
}

const fn default_economy_threshold() -> u32 {
    300
}

fn default_shooter_rows() -> Vec<u32> {
    vec![2, 1, 3]
}

fn default_column_bands() -> Vec<Vec<u32>> {
    vec![vec![1, 2], vec![3, 4], vec![5, 6, 7]]
}

const fn default_min_shooters_per_row() -> u32 {
    1
}

const fn default_min_budget_for_shooters() -> u32 {
    150
}

const fn default_proximity_distance() -> u32 {
    2
}

const fn default_cluster_threshold() -> u32 {
    3
}

const fn default_panic_column() -> u32 {
    3
}

const fn default_defense_trigger_column() -> u32 {
    4
}

const fn default_initial_budget() -> u32 {
    50
}

const fn default_consumable_clear_ms() -> u64 {
    3_000
}

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_max_ticks() -> u64 {
    600
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_loadout() -> Loadout {
    let mut loadout = Loadout::new();
    for (slot, kind) in [
        EmplacementKind::Sunflower,
        EmplacementKind::Peashooter,
        EmplacementKind::CherryBomb,
        EmplacementKind::WallNut,
        EmplacementKind::Squash,
        EmplacementKind::Jalapeno,
    ]
    .into_iter()
    .enumerate()
    {
        let slot = u8::try_from(slot).unwrap_or(u8::MAX).saturating_add(1);
        loadout.assign(kind, slot);
    }
    loadout
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = BulwarkConfig::parse("{}").unwrap();
        assert_eq!(config.dims(), GridDims::new(9, 5));
        assert_eq!(config.policy, PolicyConfig::default());
        assert_eq!(config.threat.memory_window_ms, 20_000);
        assert_eq!(config.economy.initial_budget, 50);
        assert_eq!(config.loadout.len(), 6);
        assert_eq!(config.loadout.slot(EmplacementKind::Sunflower), Some(1));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r"
policy:
  panic_column: 2
  shooter_rows: [1, 2]
kinds:
  cherry_bomb:
    cost: 120
    initial_delay_ms: 0
    recharge_delay_ms: 1000
loadout:
  sunflower: 1
  jalapeno: 2
";
        let config = BulwarkConfig::parse(yaml).unwrap();
        assert_eq!(config.policy.panic_column, 2);
        assert_eq!(config.policy.shooter_rows, vec![1, 2]);
        assert_eq!(config.policy.defense_trigger_column, 4);
        assert_eq!(config.catalog().cost(EmplacementKind::CherryBomb), 120);
        assert_eq!(config.catalog().cost(EmplacementKind::Sunflower), 50);
        assert_eq!(
            config.loadout.kinds(),
            vec![EmplacementKind::Sunflower, EmplacementKind::Jalapeno]
        );
    }

    #[test]
    fn out_of_grid_cells_are_rejected() {
        let yaml = r"
grid:
  cols: 4
";
        let err = BulwarkConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "{err}");
    }

    #[test]
    fn quota_inversion_is_rejected() {
        let yaml = r"
policy:
  production_quota: 4
  total_producer_quota: 2
";
        assert!(matches!(
            BulwarkConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn shared_loadout_slot_is_rejected() {
        let yaml = r"
loadout:
  sunflower: 1
  peashooter: 1
";
        assert!(matches!(
            BulwarkConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        assert!(matches!(
            BulwarkConfig::parse("policy: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn derived_policy_views() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.allowed_columns(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(policy.expansion_quota(), 2);
        let region = policy.primary_region();
        assert_eq!(region.len(), 6);
        assert_eq!(region.first(), Some(&Cell::new(1, 2)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = BulwarkConfig::from_file(Path::new("/nonexistent/bulwark-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
