use crate::error::ModelResult;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Timing for host synchronization. Every key is optional in TOML.
///
/// ```toml
/// inbound_debounce_ms = 300
/// outbound_debounce_ms = 500
/// editing_grace_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub inbound_debounce_ms: u64,
    pub outbound_debounce_ms: u64,
    pub editing_grace_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inbound_debounce_ms: 300,
            outbound_debounce_ms: 500,
            editing_grace_ms: 500,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn inbound_debounce(&self) -> Duration {
        Duration::from_millis(self.inbound_debounce_ms)
    }

    pub fn outbound_debounce(&self) -> Duration {
        Duration::from_millis(self.outbound_debounce_ms)
    }

    pub fn editing_grace(&self) -> Duration {
        Duration::from_millis(self.editing_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = SyncConfig::from_toml_str("outbound_debounce_ms = 750").expect("parse");
        assert_eq!(config.outbound_debounce(), Duration::from_millis(750));
        assert_eq!(config.inbound_debounce_ms, 300);
        assert_eq!(config.editing_grace_ms, 500);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SyncConfig::from_toml_str("debounce = 1").is_err());
    }
}
