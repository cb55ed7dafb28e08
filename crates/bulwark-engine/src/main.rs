//! Control-loop binary for bulwark.
//!
//! Wires the scheduler core to a seeded sandbox environment and runs the
//! tick loop until the tick limit is reached or Ctrl-C is pressed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `bulwark-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing); `RUST_LOG` wins over
//!    `logging.level`
//! 3. Load the `sandbox` section
//! 4. Build the controller and the sandbox adapters
//! 5. Run the tick loop
//! 6. Log the run report as JSON

mod error;
mod sandbox;

use std::path::{Path, PathBuf};
use std::time::Duration;

use bulwark_core::config::BulwarkConfig;
use bulwark_core::{Controller, ControllerStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::sandbox::{FieldStats, Sandbox, SandboxConfig};

/// Config file looked up in the working directory by default.
const DEFAULT_CONFIG_PATH: &str = "bulwark-config.yaml";

/// Ticks between progress lines.
const PROGRESS_EVERY_TICKS: u64 = 20;

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum EndReason {
    /// `engine.max_ticks` ticks completed.
    MaxTicksReached,
    /// Ctrl-C was received.
    Interrupted,
}

/// Final statistics of a run.
#[derive(Debug, Serialize)]
struct RunReport {
    end_reason: EndReason,
    ticks: u64,
    started_at: DateTime<Utc>,
    elapsed_ms: i64,
    resets: u32,
    controller: ControllerStats,
    field: FieldStats,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration is unreadable or invalid, or if the
/// final report cannot be serialized.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("bulwark-engine starting");
    if !found {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    let dims = config.dims();
    info!(
        cols = dims.cols,
        rows = dims.rows,
        tick_interval_ms = config.engine.tick_interval_ms,
        max_ticks = config.engine.max_ticks,
        seed = config.engine.seed,
        loadout = ?config.loadout.kinds(),
        "Configuration loaded"
    );

    // 3. Load sandbox configuration.
    let sandbox_config = load_sandbox_config(&config_path)?;
    info!(
        first_spawn_tick = sandbox_config.first_spawn_tick,
        spawn_every_ticks = sandbox_config.spawn_every_ticks,
        detector_drop_rate = sandbox_config.detector_drop_rate,
        executor_failure_rate = sandbox_config.executor_failure_rate,
        "Sandbox configuration loaded"
    );

    // 4. Build controller and sandbox.
    let mut sandbox = Sandbox::new(sandbox_config, dims, config.engine.seed);
    let mut controller = Controller::new(&config, 0);

    // 5. Run the tick loop.
    let started_at = Utc::now();
    let (end_reason, resets) = run_loop(&config, &mut controller, &mut sandbox).await;

    // 6. Log the report.
    let report = RunReport {
        end_reason,
        ticks: controller.tick(),
        started_at,
        elapsed_ms: Utc::now()
            .signed_duration_since(started_at)
            .num_milliseconds(),
        resets,
        controller: controller.stats(),
        field: sandbox.field.borrow().stats(),
    };
    let json = serde_json::to_string(&report).map_err(EngineError::from)?;
    info!(report = %json, "bulwark-engine shutdown complete");

    Ok(())
}

/// Drive the controller until the tick limit or Ctrl-C.
///
/// Engine time advances by exactly one tick interval per tick, so a run is
/// reproducible regardless of scheduling jitter. Returns the end reason and
/// the number of breach-triggered resets.
async fn run_loop(
    config: &BulwarkConfig,
    controller: &mut Controller,
    sandbox: &mut Sandbox,
) -> (EndReason, u32) {
    let interval_ms = config.engine.tick_interval_ms.max(1);
    let max_ticks = config.engine.max_ticks;
    let availability = config.loadout.clone();
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut now_ms: u64 = 0;
    let mut resets: u32 = 0;

    info!(interval_ms, max_ticks, "Tick loop starting");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            result = &mut shutdown => {
                if let Err(err) = result {
                    warn!(%err, "Failed to listen for Ctrl-C");
                }
                info!(tick = controller.tick(), "Interrupt received");
                return (EndReason::Interrupted, resets);
            }
        }

        // --- Advance the field ---
        let tick = controller.tick().saturating_add(1);
        {
            let mut field = sandbox.field.borrow_mut();
            field.observe_board(controller.board());
            let events = field.step(tick);
            if events.breached > 0 {
                warn!(tick, breached = events.breached, "Threats reached the base");
            }
            if field.needs_reset() {
                warn!(tick, "Breach threshold reached, resetting controller");
                controller.reset(now_ms);
                field.reset();
                resets = resets.saturating_add(1);
            }
        }

        // --- Run the scheduler ---
        let summary = controller.run_tick(
            now_ms,
            &mut sandbox.detector,
            &mut sandbox.economy,
            &mut sandbox.executor,
            &availability,
        );

        if summary.tick.checked_rem(PROGRESS_EVERY_TICKS) == Some(0) {
            let stats = controller.stats();
            info!(
                tick = summary.tick,
                phase = ?summary.phase,
                budget = summary.budget,
                placements = stats.placements,
                lost = stats.lost,
                threats = sandbox.field.borrow().threats().len(),
                "Progress"
            );
        }

        if max_ticks > 0 && summary.tick >= max_ticks {
            info!(tick = summary.tick, max_ticks, "Tick limit reached");
            return (EndReason::MaxTicksReached, resets);
        }

        now_ms = now_ms.saturating_add(interval_ms);
    }
}

/// Load the main configuration.
///
/// A missing file is not an error: defaults are used, with the
/// `BULWARK_LOG` override still applied. The flag reports whether the file
/// was found.
fn load_config(path: &Path) -> Result<(BulwarkConfig, bool), EngineError> {
    if path.exists() {
        Ok((BulwarkConfig::from_file(path)?, true))
    } else {
        let mut config = BulwarkConfig::default();
        config.logging.apply_env_overrides();
        Ok((config, false))
    }
}

/// Load sandbox configuration from the `sandbox` section of the config
/// file. Missing file or section yields defaults.
fn load_sandbox_config(path: &Path) -> Result<SandboxConfig, EngineError> {
    if !path.exists() {
        return Ok(SandboxConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Sandbox {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "sandbox" section.
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Sandbox {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    let config = match raw.get("sandbox") {
        Some(section) => serde_yml::from_value(section.clone()).map_err(|e| EngineError::Sandbox {
            message: format!("failed to parse sandbox config: {e}"),
        })?,
        None => SandboxConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
