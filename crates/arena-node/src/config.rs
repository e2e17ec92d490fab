//! Node configuration: engine settings plus logging.
//!
//! Load order: built-in defaults, then an optional JSON file, then `ARENA_*`
//! environment variables. Anything that fails to parse or validate is a
//! `Configuration` error.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use arena_types::constants::DEFAULT_STARTING_BALANCE;
use arena_types::{ArenaError, EngineConfig, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub engine: EngineConfig,
    pub log: LogConfig,
    /// Coin granted to each wallet by the in-memory ledger.
    pub starting_balance: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log: LogConfig::default(),
            starting_balance: DEFAULT_STARTING_BALANCE,
        }
    }
}

impl NodeConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ArenaError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ArenaError::Configuration(e.to_string()))
    }

    /// Apply `ARENA_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ARENA_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = lookup("ARENA_LOG_JSON") {
            self.log.json = parse("ARENA_LOG_JSON", &v)?;
        }
        if let Some(v) = lookup("ARENA_SHOP_ADDRESS") {
            self.engine.shop_address = v;
        }
        if let Some(v) = lookup("ARENA_PACK_PRICE") {
            self.engine.pack_price = parse("ARENA_PACK_PRICE", &v)?;
        }
        if let Some(v) = lookup("ARENA_PACK_CARD_COUNT") {
            self.engine.pack_card_count = parse("ARENA_PACK_CARD_COUNT", &v)?;
        }
        if let Some(v) = lookup("ARENA_RNG_SEED") {
            self.engine.rng_seed = Some(parse("ARENA_RNG_SEED", &v)?);
        }
        if let Some(v) = lookup("ARENA_MAX_INFLIGHT_SETTLEMENTS") {
            self.engine.max_inflight_settlements = parse("ARENA_MAX_INFLIGHT_SETTLEMENTS", &v)?;
        }
        if let Some(v) = lookup("ARENA_HEARTBEAT_MS") {
            self.engine.heartbeat_interval_ms = parse("ARENA_HEARTBEAT_MS", &v)?;
        }
        if let Some(v) = lookup("ARENA_STARTING_BALANCE") {
            self.starting_balance = parse("ARENA_STARTING_BALANCE", &v)?;
        }
        Ok(())
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ArenaError::Configuration(format!("{key}={raw:?}: {e}")))
}
