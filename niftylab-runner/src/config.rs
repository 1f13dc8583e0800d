//! Run configuration: the TOML file behind `niftylab run`.
//!
//! ```toml
//! [data]
//! cache_dir = "data"
//! interval = "1d"
//! symbols = ["RELIANCE.NS", "TCS.NS"]
//!
//! [simulator]
//! starting_cash = 100000.0
//!
//! [[strategies]]
//! type = "ma_crossover"
//! fast = 5
//! slow = 20
//!
//! [ranking]
//! sharpe = 0.4
//! ```
//!
//! Every section is optional. An empty strategy list means the default set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use niftylab_core::data::{Universe, UniverseError};
use niftylab_core::domain::Interval;
use niftylab_core::engine::SimulatorConfig;
use niftylab_core::error::ConfigError;
use niftylab_core::signals::StrategyConfig;

use crate::ranking::RankingWeights;

/// Unique identifier for a run configuration (content hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("no symbols configured: set data.symbols or data.universe")]
    NoSymbols,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_interval() -> Interval {
    Interval::Day1
}

/// Where the series come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Universe TOML file. Relative paths resolve against the config file.
    #[serde(default)]
    pub universe: Option<PathBuf>,
    /// Restrict the universe to one group.
    #[serde(default)]
    pub group: Option<String>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            interval: default_interval(),
            symbols: Vec::new(),
            universe: None,
            group: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub ranking: RankingWeights,
    /// Directory of the file this config was read from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check simulator, strategy and ranking parameters. Runs before any
    /// backtest starts.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.simulator.validate()?;
        for strategy in &self.strategies {
            strategy.validate()?;
        }
        self.ranking.validate()?;
        if self.data.symbols.is_empty() && self.data.universe.is_none() {
            return Err(RunConfigError::NoSymbols);
        }
        Ok(())
    }

    /// Configured strategies, or the default set when none are listed.
    pub fn effective_strategies(&self) -> Vec<StrategyConfig> {
        if self.strategies.is_empty() {
            StrategyConfig::default_set()
        } else {
            self.strategies.clone()
        }
    }

    /// Explicit symbols followed by the universe's, first occurrence wins.
    pub fn resolve_symbols(&self) -> Result<Vec<String>, RunConfigError> {
        let mut symbols = self.data.symbols.clone();
        if let Some(path) = &self.data.universe {
            let universe = Universe::from_file(&self.resolve_path(path))?;
            match &self.data.group {
                Some(group) => symbols.extend_from_slice(universe.group(group)?),
                None => symbols.extend(universe.all_symbols()),
            }
        }
        let mut seen = HashSet::new();
        symbols.retain(|s| seen.insert(s.clone()));
        if symbols.is_empty() {
            return Err(RunConfigError::NoSymbols);
        }
        Ok(symbols)
    }

    /// Cache directory, resolved like the universe path.
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_path(&self.data.cache_dir)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Deterministic hash of the parameters that shape results.
    pub fn run_id(&self) -> RunId {
        let identity = (
            &self.data.interval,
            &self.simulator,
            self.effective_strategies(),
            &self.ranking,
        );
        let json = serde_json::to_vec(&identity).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}
