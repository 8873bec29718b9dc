use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Cadence of the completion-reset tick loop. One minute matches the
/// resolution of the midnight check — ticking faster gains nothing.
pub const DEFAULT_RESET_TICK_SECS: u64 = 60;
/// How many times a versioned routine write is retried before the operation
/// surfaces a contention error to the caller.
pub const DEFAULT_CAS_MAX_RETRIES: u32 = 3;

/// Top-level config (routinely.toml + ROUTINELY_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutinelyConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for RoutinelyConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_reset_tick_secs")]
    pub reset_tick_secs: u64,
    #[serde(default = "default_cas_max_retries")]
    pub cas_max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reset_tick_secs: DEFAULT_RESET_TICK_SECS,
            cas_max_retries: DEFAULT_CAS_MAX_RETRIES,
        }
    }
}

fn default_reset_tick_secs() -> u64 {
    DEFAULT_RESET_TICK_SECS
}
fn default_cas_max_retries() -> u32 {
    DEFAULT_CAS_MAX_RETRIES
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.routinely/routinely.db", home)
}

impl RoutinelyConfig {
    /// Load config from a TOML file with ROUTINELY_* env var overrides.
    ///
    /// Checks the explicit path argument first, then ~/.routinely/routinely.toml.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RoutinelyConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ROUTINELY_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.routinely/routinely.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = RoutinelyConfig::default();
        assert_eq!(cfg.engine.reset_tick_secs, 60);
        assert_eq!(cfg.engine.cas_max_retries, 3);
        assert!(cfg.database.path.ends_with("routinely.db"));
    }
}
