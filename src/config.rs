use crate::virtual_controller::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILENAME: &str = "padbridge_config.json";

pub const ENV_CONTROLLERS: &str = "NUM_CONTROLLERS";
pub const ENV_PORT: &str = "VIGEM_PORT";
pub const ENV_BACKEND: &str = "PADBRIDGE_BACKEND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Reported by `GET /status`
    pub name: String,
    /// Number of virtual controllers; the pool clamps it to 1..=4
    pub controllers: usize,
    pub port: u16,
    pub backend: BackendKind,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "Padbridge Virtual Controller Server".to_string(),
            controllers: 1,
            port: 7777,
            backend: BackendKind::Native,
        }
    }
}

impl BridgeConfig {
    /// Defaults, then the config file if there is one, then the environment.
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_file() -> Option<Self> {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        log::error!("Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    log::error!("Failed to read config file: {}", e);
                }
            }
        }
        None
    }

    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILENAME)
    }

    /// Override fields from `lookup`. Values that don't parse are logged
    /// and the current value is kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CONTROLLERS) {
            match value.trim().parse::<usize>() {
                Ok(n) => self.controllers = n,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_CONTROLLERS, value, e),
            }
        }
        if let Some(value) = lookup(ENV_PORT) {
            match value.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_PORT, value, e),
            }
        }
        if let Some(value) = lookup(ENV_BACKEND) {
            match value.parse::<BackendKind>() {
                Ok(kind) => self.backend = kind,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_BACKEND, value, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.controllers, 1);
        assert_eq!(config.port, 7777);
        assert_eq!(config.backend, BackendKind::Native);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = BridgeConfig::default();
        config.apply_env(env(&[
            (ENV_CONTROLLERS, "3"),
            (ENV_PORT, " 8080 "),
            (ENV_BACKEND, "loopback"),
        ]));
        assert_eq!(config.controllers, 3);
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend, BackendKind::Loopback);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = BridgeConfig::default();
        config.apply_env(env(&[
            (ENV_CONTROLLERS, "four"),
            (ENV_PORT, "99999"),
            (ENV_BACKEND, "usb"),
        ]));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{ "controllers": 2, "backend": "loopback" }"#).unwrap();
        assert_eq!(config.controllers, 2);
        assert_eq!(config.backend, BackendKind::Loopback);
        assert_eq!(config.port, 7777);
    }
}
