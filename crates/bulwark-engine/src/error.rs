//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific failure so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: bulwark_core::config::ConfigError,
    },

    /// The `sandbox` section could not be read or is invalid.
    #[error("sandbox error: {message}")]
    Sandbox {
        /// Description of the sandbox failure.
        message: String,
    },

    /// The final run report could not be serialized.
    #[error("report error: {source}")]
    Report {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
