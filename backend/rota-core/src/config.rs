// src/config.rs
use serde::Deserialize;
use tracing::info;

use crate::continuity::DEFAULT_MAX_CONSECUTIVE_DAYS;
use crate::error::{EngineError, EngineResult};
use crate::invoice::ROUTE_SUPPORT_SERVICE;
use crate::memo::DEFAULT_CACHE_KEY_MAX_LEN;

pub const ENV_PREFIX: &str = "ROTA_";

// --- Engine Configuration ---

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Service whose pay is driven only by assigned incentives.
    #[serde(default = "default_route_support_service")]
    pub route_support_service: String,
    /// Length of the consecutive-working-day run that is flagged.
    #[serde(default = "default_max_consecutive_days")]
    pub max_consecutive_days: u32,
    #[serde(default = "default_cache_key_max_len")]
    pub cache_key_max_len: usize,
    /// Fallback filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_route_support_service() -> String {
    ROUTE_SUPPORT_SERVICE.to_string()
}

fn default_max_consecutive_days() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_DAYS
}

fn default_cache_key_max_len() -> usize {
    DEFAULT_CACHE_KEY_MAX_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            route_support_service: default_route_support_service(),
            max_consecutive_days: default_max_consecutive_days(),
            cache_key_max_len: default_cache_key_max_len(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Reads `ROTA_*` variables, loading a `.env` file first if one exists.
    pub fn from_env() -> EngineResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Builds the config from explicit key/value pairs (used by tests).
    pub fn from_vars<I>(vars: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, EngineConfig>(vars)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        info!(
            "Engine configuration loaded: max_consecutive_days={}, route_support_service={:?}",
            config.max_consecutive_days, config.route_support_service
        );
        Ok(config)
    }

    /// `ROTA_LOG_LEVEL` from the process environment, or the default level.
    ///
    /// Read on its own so logging can be installed before the full config loads.
    pub fn log_level_from_env() -> String {
        dotenv::dotenv().ok();
        Self::log_level_from_vars(std::env::vars())
    }

    pub fn log_level_from_vars<I>(vars: I) -> String
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let key = format!("{}LOG_LEVEL", ENV_PREFIX);
        vars.into_iter()
            .find(|(name, value)| *name == key && !value.trim().is_empty())
            .map(|(_, value)| value)
            .unwrap_or_else(default_log_level)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_consecutive_days < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "max_consecutive_days must be at least 2, got {}",
                self.max_consecutive_days
            )));
        }
        if self.cache_key_max_len < 64 {
            return Err(EngineError::InvalidConfig(format!(
                "cache_key_max_len must be at least 64, got {}",
                self.cache_key_max_len
            )));
        }
        if self.route_support_service.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "route_support_service must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = EngineConfig::from_vars(vars(&[("UNRELATED", "1")])).expect("defaults are valid");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.route_support_service, "Route Support");
        assert_eq!(config.max_consecutive_days, 7);
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = EngineConfig::from_vars(vars(&[
            ("ROTA_MAX_CONSECUTIVE_DAYS", "6"),
            ("ROTA_ROUTE_SUPPORT_SERVICE", "Support Route"),
            ("ROTA_LOG_LEVEL", "debug"),
        ]))
        .expect("valid overrides");
        assert_eq!(config.max_consecutive_days, 6);
        assert_eq!(config.route_support_service, "Support Route");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn log_level_is_readable_without_the_full_config() {
        // An invalid field elsewhere must not hide the log level
        let pairs = vars(&[
            ("ROTA_MAX_CONSECUTIVE_DAYS", "seven"),
            ("ROTA_LOG_LEVEL", "rota_core=debug"),
        ]);
        assert_eq!(EngineConfig::log_level_from_vars(pairs.clone()), "rota_core=debug");
        assert!(EngineConfig::from_vars(pairs).is_err());

        assert_eq!(EngineConfig::log_level_from_vars(vars(&[("ROTA_LOG_LEVEL", " ")])), "info");
        assert_eq!(EngineConfig::log_level_from_vars(Vec::new()), "info");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let too_short = EngineConfig::from_vars(vars(&[("ROTA_MAX_CONSECUTIVE_DAYS", "1")]));
        assert!(matches!(too_short, Err(EngineError::InvalidConfig(_))));

        let not_a_number = EngineConfig::from_vars(vars(&[("ROTA_MAX_CONSECUTIVE_DAYS", "seven")]));
        assert!(matches!(not_a_number, Err(EngineError::InvalidConfig(_))));
    }
}
