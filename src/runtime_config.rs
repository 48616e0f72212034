// =============================================================================
// Runtime Configuration — service settings with atomic save
// =============================================================================
//
// Every tunable of the analytics service lives here: where to listen, where
// market data comes from, the benchmark and annualisation conventions, the
// symbol universe and the screener's default weights.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::universe::{default_entries, Universe, UniverseEntry};
use crate::market_data::yahoo::DEFAULT_BASE_URL;
use crate::risk::RiskParams;
use crate::screener::ScreenerWeights;

pub const DEFAULT_CONFIG_PATH: &str = "analytics_config.json";

/// Environment variable overriding `bind_addr`.
pub const ENV_BIND_ADDR: &str = "ANALYTICS_BIND_ADDR";
/// Environment variable overriding `benchmark_symbol`.
pub const ENV_BENCHMARK: &str = "ANALYTICS_BENCHMARK";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_provider_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_benchmark_symbol() -> String {
    "^TASI.SR".to_string()
}

fn default_risk_free_rate() -> f64 {
    0.02
}

fn default_trading_days() -> u32 {
    252
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration for the analytics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Serving -------------------------------------------------------------

    /// Socket address the REST API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Browser origins allowed by CORS.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    // --- Market data ---------------------------------------------------------

    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of per-symbol provider calls in flight during batch
    /// operations.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    // --- Analytics conventions -----------------------------------------------

    /// Index used for beta, alpha and tracking error.
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: String,

    /// Annual risk-free rate as a fraction.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    #[serde(default = "default_trading_days")]
    pub trading_days: u32,

    // --- Universe & screener -------------------------------------------------

    /// Ordered list of covered symbols with display names.
    #[serde(default = "default_entries")]
    pub universe: Vec<UniverseEntry>,

    /// Weights used when a screener request carries none.
    #[serde(default)]
    pub default_weights: ScreenerWeights,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_origins: default_cors_origins(),
            provider_base_url: default_provider_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            fetch_concurrency: default_fetch_concurrency(),
            benchmark_symbol: default_benchmark_symbol(),
            risk_free_rate: default_risk_free_rate(),
            trading_days: default_trading_days(),
            universe: default_entries(),
            default_weights: ScreenerWeights::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid config in {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = config.universe.len(),
            benchmark = %config.benchmark_symbol,
            "config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write (write to
    /// `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }

    /// Apply `ANALYTICS_BIND_ADDR` / `ANALYTICS_BENCHMARK` when set and
    /// non-empty.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ENV_BIND_ADDR).filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(symbol) = lookup(ENV_BENCHMARK).filter(|v| !v.trim().is_empty()) {
            self.benchmark_symbol = symbol.trim().to_string();
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            anyhow::bail!("fetch_concurrency must be at least 1");
        }
        if self.trading_days == 0 {
            anyhow::bail!("trading_days must be at least 1");
        }
        if !self.risk_free_rate.is_finite() {
            anyhow::bail!("risk_free_rate must be finite");
        }
        if self.benchmark_symbol.trim().is_empty() {
            anyhow::bail!("benchmark_symbol must not be empty");
        }
        if self.universe.is_empty() {
            anyhow::bail!("universe must contain at least one symbol");
        }
        self.default_weights
            .validate()
            .context("default_weights out of range")?;
        Ok(())
    }

    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            risk_free_annual: self.risk_free_rate,
            trading_days: self.trading_days,
        }
    }

    pub fn universe(&self) -> Universe {
        Universe::new(self.universe.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
