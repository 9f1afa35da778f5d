//! Data-driven balance definitions.
//!
//! The built-in tables are plain Rust; deployments can override a small
//! set of economy knobs with a RON file at boot.

pub mod building_data;
pub mod faction_data;
pub mod research_data;
pub mod unit_data;
pub mod weapon_data;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::{GameError, Result};

/// Optional boot-time overrides for economy tuning.
///
/// # Example RON
///
/// ```ron
/// BalanceOverrides(
///     base_income_per_sec: Some(6.0),
///     refinery_income_per_sec: Some(18.0),
///     low_power_modifier: None,
/// )
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceOverrides {
    /// Override for [`GameConfig::base_income_per_sec`].
    #[serde(default)]
    pub base_income_per_sec: Option<f32>,
    /// Override for [`GameConfig::refinery_income_per_sec`].
    #[serde(default)]
    pub refinery_income_per_sec: Option<f32>,
    /// Override for [`GameConfig::low_power_modifier`].
    #[serde(default)]
    pub low_power_modifier: Option<f32>,
}

impl BalanceOverrides {
    /// Parse overrides from RON text.
    pub fn from_ron_str(path: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Apply the overrides to a config.
    #[must_use]
    pub fn apply(self, mut config: GameConfig) -> GameConfig {
        if let Some(v) = self.base_income_per_sec {
            config.base_income_per_sec = v;
        }
        if let Some(v) = self.refinery_income_per_sec {
            config.refinery_income_per_sec = v;
        }
        if let Some(v) = self.low_power_modifier {
            config.low_power_modifier = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ron_round_trip() {
        let text = "BalanceOverrides(base_income_per_sec: Some(6.0))";
        let overrides = BalanceOverrides::from_ron_str("test.ron", text).unwrap();
        assert_eq!(overrides.base_income_per_sec, Some(6.0));

        let config = overrides.apply(GameConfig::default());
        assert_eq!(config.base_income_per_sec, 6.0);
    }

    #[test]
    fn test_bad_ron_is_a_parse_error() {
        let err = BalanceOverrides::from_ron_str("bad.ron", "not ron at all (").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }
}
