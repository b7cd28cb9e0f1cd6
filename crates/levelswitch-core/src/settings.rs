//! Switcher settings
//!
//! Everything here is persisted with the rules and defaulted field by field,
//! so older settings files keep loading.

use crate::logging::LogConfig;
use crate::rule::LevelCondition;
use serde::{Deserialize, Serialize};

/// Default name of the previous-scene marker
pub const PREVIOUS_SCENE_NAME: &str = "Previous Scene";

/// Default evaluation interval in milliseconds
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 300;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitcherSettings {
    /// Scene name that stands for "the scene before the current one"
    pub previous_scene_name: String,
    /// Comparator used for rules that do not specify one
    pub default_condition: LevelCondition,
    /// Tolerance for threshold equality in edit lookups (0 = exact)
    pub threshold_tolerance: f32,
    /// Evaluation interval of the background loop
    pub check_interval_ms: u64,
    /// Log every match at info level
    pub verbose: bool,
    /// Logging configuration
    pub log_config: LogConfig,
}

impl Default for SwitcherSettings {
    fn default() -> Self {
        Self {
            previous_scene_name: PREVIOUS_SCENE_NAME.to_string(),
            default_condition: LevelCondition::Above,
            threshold_tolerance: 0.0,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            verbose: false,
            log_config: LogConfig::default(),
        }
    }
}

impl SwitcherSettings {
    /// True if a scene name is the previous-scene marker
    pub fn is_previous_scene(&self, scene_name: &str) -> bool {
        scene_name == self.previous_scene_name
    }

    /// Evaluation interval as a `Duration` (at least 1 ms)
    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.check_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SwitcherSettings::default();
        assert_eq!(settings.previous_scene_name, "Previous Scene");
        assert_eq!(settings.default_condition, LevelCondition::Above);
        assert_eq!(settings.threshold_tolerance, 0.0);
        assert_eq!(settings.check_interval_ms, 300);
        assert!(!settings.verbose);
    }

    #[test]
    fn test_is_previous_scene() {
        let settings = SwitcherSettings::default();
        assert!(settings.is_previous_scene("Previous Scene"));
        assert!(!settings.is_previous_scene("previous scene"));
        assert!(!settings.is_previous_scene(""));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let settings = SwitcherSettings {
            check_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(settings.check_interval().as_millis(), 1);
    }

    #[test]
    fn test_partial_deserialization() {
        let settings: SwitcherSettings =
            serde_json::from_str(r#"{ "verbose": true, "default_condition": "below" }"#).unwrap();
        assert!(settings.verbose);
        assert_eq!(settings.default_condition, LevelCondition::Below);
        assert_eq!(settings.previous_scene_name, PREVIOUS_SCENE_NAME);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let original = SwitcherSettings {
            previous_scene_name: "Back".to_string(),
            threshold_tolerance: 0.01,
            ..Default::default()
        };
        let json = serde_json::to_string(&original).expect("Failed to serialize");
        let restored: SwitcherSettings =
            serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(original, restored);
    }
}
