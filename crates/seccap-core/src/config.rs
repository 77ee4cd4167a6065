//! # Solver Configuration
//!
//! YAML-based configuration of the secrecy optimizer:
//!
//! - Convergence tolerances of the outer loop, the inner loop and the
//!   dual-variable bisection
//! - Hard iteration caps at each of the three levels
//! - Whether per-inner-iteration diagnostic events are emitted
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `SECCAP_CONFIG` environment variable
//! 2. `./seccap.yaml` (current directory)
//! 3. `~/.config/seccap/config.yaml` (user config)
//! 4. `/etc/seccap/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! tolerances:
//!   outer: 1.0e-6
//!   inner: 1.0e-4
//!   bisection: 1.0e-12
//!
//! limits:
//!   max_outer_iterations: 5000
//!   max_inner_iterations: 20000
//!   max_bisection_steps: 2000
//!
//! emit_inner_events: false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "SECCAP_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write a configuration file
    #[error("failed to access config: {0}")]
    Io(String),
    /// Failed to parse configuration
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// Invalid configuration value
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Convergence tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Outer objective change (nats) that ends the outer loop
    pub outer: f64,
    /// Inner bound change that ends the inner loop
    pub inner: f64,
    /// Final width of the dual-variable bracket
    pub bisection: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            outer: 1e-6,
            inner: 1e-4,
            bisection: 1e-12,
        }
    }
}

impl Tolerances {
    /// Replace every tolerance the overrides specify.
    pub fn apply(&mut self, overrides: &ToleranceOverrides) {
        if let Some(outer) = overrides.outer {
            self.outer = outer;
        }
        if let Some(inner) = overrides.inner {
            self.inner = inner;
        }
        if let Some(bisection) = overrides.bisection {
            self.bisection = bisection;
        }
    }
}

/// Caller-supplied replacements for individual tolerances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToleranceOverrides {
    pub outer: Option<f64>,
    pub inner: Option<f64>,
    pub bisection: Option<f64>,
}

/// Hard iteration caps.
///
/// Converging runs on 8x8x8 channels at high SNR can take a few thousand
/// inner iterations; hitting a cap means numerical non-convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationLimits {
    pub max_outer_iterations: usize,
    pub max_inner_iterations: usize,
    pub max_bisection_steps: usize,
}

impl Default for IterationLimits {
    fn default() -> Self {
        Self {
            max_outer_iterations: 5_000,
            max_inner_iterations: 20_000,
            max_bisection_steps: 2000,
        }
    }
}

/// Complete solver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub tolerances: Tolerances,
    pub limits: IterationLimits,
    /// Emit one diagnostic event per inner iteration
    pub emit_inner_events: bool,
}

impl SolverConfig {
    /// Load configuration from the default search path.
    ///
    /// Search order:
    /// 1. `SECCAP_CONFIG` environment variable
    /// 2. `./seccap.yaml`
    /// 3. `~/.config/seccap/config.yaml`
    /// 4. `/etc/seccap/config.yaml`
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = Path::new(&path);
            if path.exists() {
                return Self::load_from(path);
            }
            tracing::warn!(path = %path.display(), "SECCAP_CONFIG points to a missing file");
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded solver config");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))
    }

    /// Copy of this configuration with some tolerances replaced.
    pub fn with_overrides(mut self, overrides: &ToleranceOverrides) -> Self {
        self.tolerances.apply(overrides);
        self
    }

    /// Get configuration search paths (the environment variable excluded).
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./seccap.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "seccap") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/seccap/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tolerances;
        for (name, value) in [("outer", t.outer), ("inner", t.inner), ("bisection", t.bisection)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "{name} tolerance must be finite and positive, got {value}"
                )));
            }
        }

        let l = &self.limits;
        for (name, value) in [
            ("max_outer_iterations", l.max_outer_iterations),
            ("max_inner_iterations", l.max_inner_iterations),
            ("max_bisection_steps", l.max_bisection_steps),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        serde_yaml::to_string(&Self::default()).unwrap_or_default()
    }
}
