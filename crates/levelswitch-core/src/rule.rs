//! Audio switch rules
//!
//! An [`AudioRule`] says: when the level of an audio source crosses a
//! threshold, switch to a scene (or back to the previous scene) using a
//! transition.

use crate::handle::{HandleResolver, WeakHandle};
use serde::{Deserialize, Serialize};

/// Unique identifier for a rule, assigned by the store
pub type RuleId = u64;

/// Direction of the threshold comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelCondition {
    /// Fires while the level is strictly above the threshold
    #[default]
    Above,
    /// Fires while the level is strictly below the threshold
    Below,
}

impl LevelCondition {
    /// Check a live level against a threshold
    pub fn is_met(self, level: f32, threshold: f32) -> bool {
        match self {
            LevelCondition::Above => level > threshold,
            LevelCondition::Below => level < threshold,
        }
    }

    /// Persisted name
    pub fn as_str(self) -> &'static str {
        match self {
            LevelCondition::Above => "above",
            LevelCondition::Below => "below",
        }
    }

    /// Parse a persisted name (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "above" => Some(LevelCondition::Above),
            "below" => Some(LevelCondition::Below),
            _ => None,
        }
    }
}

/// Build the list label of a rule from its scene and transition names
pub fn make_display_key(scene_name: &str, transition_name: &str) -> String {
    format!("{} using {}", scene_name, transition_name)
}

/// One audio-triggered switch rule
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRule {
    /// Store-assigned identity (0 until added to a store)
    pub id: RuleId,
    /// Monitored audio source
    pub audio_source: WeakHandle,
    /// Level that triggers the rule, in meter units
    pub volume_threshold: f32,
    /// Comparison direction
    pub condition: LevelCondition,
    /// Target scene, ignored when `use_previous_scene` is set
    pub scene: WeakHandle,
    /// Transition used for the switch
    pub transition: WeakHandle,
    /// Switch back to whichever scene was active before the current one
    pub use_previous_scene: bool,
    /// Derived label `(scene, transition)`; recomputed, never authoritative
    pub display_key: String,
}

impl AudioRule {
    /// Create a rule. The display key is derived from the handles' cached names.
    pub fn new(
        audio_source: WeakHandle,
        volume_threshold: f32,
        scene: WeakHandle,
        transition: WeakHandle,
        use_previous_scene: bool,
        previous_scene_name: &str,
    ) -> Self {
        let mut rule = Self {
            id: 0,
            audio_source,
            volume_threshold,
            condition: LevelCondition::default(),
            scene,
            transition,
            use_previous_scene,
            display_key: String::new(),
        };
        rule.display_key = make_display_key(
            rule.scene_label(previous_scene_name),
            rule.transition.cached_name(),
        );
        rule
    }

    /// Builder-style condition override
    pub fn with_condition(mut self, condition: LevelCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Scene name as shown to the user: the sentinel for previous-scene rules
    pub fn scene_label<'a>(&'a self, previous_scene_name: &'a str) -> &'a str {
        if self.use_previous_scene {
            previous_scene_name
        } else {
            self.scene.cached_name()
        }
    }

    /// True if the rule would survive a save: the target scene (or the
    /// previous-scene marker) and the transition must both resolve.
    pub fn is_persistable(&self, resolver: &dyn HandleResolver) -> bool {
        (self.use_previous_scene || resolver.name_of(&self.scene).is_some())
            && resolver.name_of(&self.transition).is_some()
    }

    /// Re-read handle names from the host and rebuild the display key.
    ///
    /// Dangling handles keep their last known name.
    pub fn refresh_display_key(
        &mut self,
        resolver: &dyn HandleResolver,
        previous_scene_name: &str,
    ) {
        self.audio_source.refresh(resolver);
        self.scene.refresh(resolver);
        self.transition.refresh(resolver);
        self.display_key = make_display_key(
            self.scene_label(previous_scene_name),
            self.transition.cached_name(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleKind;
    use crate::registry::MemoryRegistry;

    #[test]
    fn test_condition_comparison() {
        assert!(LevelCondition::Above.is_met(0.6, 0.5));
        assert!(!LevelCondition::Above.is_met(0.5, 0.5));
        assert!(LevelCondition::Below.is_met(0.4, 0.5));
        assert!(!LevelCondition::Below.is_met(0.5, 0.5));
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!(LevelCondition::parse("above"), Some(LevelCondition::Above));
        assert_eq!(LevelCondition::parse("BELOW"), Some(LevelCondition::Below));
        assert_eq!(LevelCondition::parse("sideways"), None);
        assert_eq!(
            LevelCondition::parse(LevelCondition::Below.as_str()),
            Some(LevelCondition::Below)
        );
    }

    #[test]
    fn test_display_key_uses_scene_and_transition_only() {
        let registry = MemoryRegistry::new();
        registry.add_scene("Scene1");
        registry.add_transition("Fade");
        registry.add_audio_source("Mic");

        let rule = AudioRule::new(
            registry.resolve(HandleKind::AudioSource, "Mic"),
            0.5,
            registry.resolve(HandleKind::Scene, "Scene1"),
            registry.resolve(HandleKind::Transition, "Fade"),
            false,
            "Previous Scene",
        );
        assert_eq!(rule.display_key, "Scene1 using Fade");
        assert_eq!(rule.id, 0);
    }

    #[test]
    fn test_display_key_for_previous_scene() {
        let rule = AudioRule::new(
            WeakHandle::absent(HandleKind::AudioSource),
            0.5,
            WeakHandle::absent(HandleKind::Scene),
            WeakHandle::new(HandleKind::Transition, 3, "Cut"),
            true,
            "Previous Scene",
        );
        assert_eq!(rule.display_key, "Previous Scene using Cut");
    }

    #[test]
    fn test_refresh_after_rename() {
        let registry = MemoryRegistry::new();
        let scene_id = registry.add_scene("Scene1");
        registry.add_transition("Fade");

        let mut rule = AudioRule::new(
            WeakHandle::absent(HandleKind::AudioSource),
            0.5,
            registry.resolve(HandleKind::Scene, "Scene1"),
            registry.resolve(HandleKind::Transition, "Fade"),
            false,
            "Previous Scene",
        );

        registry.rename(scene_id, "Live");
        rule.refresh_display_key(&registry, "Previous Scene");
        assert_eq!(rule.display_key, "Live using Fade");
    }

    #[test]
    fn test_persistable() {
        let registry = MemoryRegistry::new();
        let scene_id = registry.add_scene("Scene1");
        registry.add_transition("Fade");

        let scene = registry.resolve(HandleKind::Scene, "Scene1");
        let fade = registry.resolve(HandleKind::Transition, "Fade");
        let mic = WeakHandle::absent(HandleKind::AudioSource);

        let direct = AudioRule::new(mic.clone(), 0.5, scene.clone(), fade.clone(), false, "P");
        let previous = AudioRule::new(mic.clone(), 0.5, scene, fade.clone(), true, "P");
        assert!(direct.is_persistable(&registry));

        registry.remove(scene_id);
        assert!(!direct.is_persistable(&registry));
        assert!(previous.is_persistable(&registry));

        let no_transition = AudioRule::new(
            mic,
            0.5,
            WeakHandle::absent(HandleKind::Scene),
            WeakHandle::absent(HandleKind::Transition),
            true,
            "P",
        );
        assert!(!no_transition.is_persistable(&registry));
    }
}
