//! Audio switch persistence
//!
//! Rules are stored as the `"audioSwitches"` array of a generic JSON
//! document. Saving writes only rules whose scene (or the previous-scene
//! marker) and transition still resolve. Loading is lenient: a record with a
//! missing or mistyped field keeps going with an empty value, and names that
//! no longer resolve produce dangling handles instead of errors.

use levelswitch_core::{
    AudioRule, HandleKind, HandleResolver, LevelCondition, RuleStore, SwitcherContext,
    SwitcherSettings, WeakHandle,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Name of the rule array inside the document
pub const AUDIO_SWITCHES_KEY: &str = "audioSwitches";

/// One persisted audio switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSwitchRecord {
    /// Scene name, or the previous-scene marker
    pub scene: String,
    /// Transition name
    pub transition: String,
    /// Monitored audio source name
    pub audio_source: String,
    /// Trigger threshold
    pub volume: f32,
    /// Comparator direction
    pub condition: LevelCondition,
}

impl AudioSwitchRecord {
    /// Build the record for a rule, `None` if the rule is not persistable
    pub fn from_rule(
        rule: &AudioRule,
        resolver: &dyn HandleResolver,
        settings: &SwitcherSettings,
    ) -> Option<Self> {
        let transition = resolver.name_of(&rule.transition)?;
        let scene = if rule.use_previous_scene {
            settings.previous_scene_name.clone()
        } else {
            resolver.name_of(&rule.scene)?
        };
        // A dangling source does not block the save; the last known name is kept
        let audio_source = resolver
            .name_of(&rule.audio_source)
            .unwrap_or_else(|| rule.audio_source.cached_name().to_string());

        Some(Self {
            scene,
            transition,
            audio_source,
            volume: rule.volume_threshold,
            condition: rule.condition,
        })
    }

    /// Parse a record field by field. Missing or mistyped fields fall back to
    /// empty values, so a non-object element reads as a record with no fields.
    pub fn from_value(value: &Value, settings: &SwitcherSettings) -> Self {
        let field = |key: &str| value.as_object().and_then(|object| object.get(key));
        let string = |key: &str| {
            field(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            scene: string("scene"),
            transition: string("transition"),
            audio_source: string("audioSource"),
            volume: field("volume")
                .and_then(Value::as_f64)
                .map(|v| v as f32)
                .unwrap_or(0.0),
            condition: field("condition")
                .and_then(Value::as_str)
                .and_then(LevelCondition::parse)
                .unwrap_or(settings.default_condition),
        }
    }

    /// Turn the record back into a rule, resolving names against the host.
    ///
    /// Names that do not resolve are kept on dangling handles.
    pub fn into_rule(
        self,
        resolver: &dyn HandleResolver,
        settings: &SwitcherSettings,
    ) -> AudioRule {
        let use_previous_scene = settings.is_previous_scene(&self.scene);
        let scene = if use_previous_scene {
            WeakHandle::absent(HandleKind::Scene)
        } else {
            resolve_or_keep(resolver, HandleKind::Scene, &self.scene)
        };

        AudioRule::new(
            resolve_or_keep(resolver, HandleKind::AudioSource, &self.audio_source),
            self.volume,
            scene,
            resolve_or_keep(resolver, HandleKind::Transition, &self.transition),
            use_previous_scene,
            &settings.previous_scene_name,
        )
        .with_condition(self.condition)
    }
}

fn resolve_or_keep(resolver: &dyn HandleResolver, kind: HandleKind, name: &str) -> WeakHandle {
    let handle = resolver.resolve(kind, name);
    if handle.is_absent() && !name.is_empty() {
        debug!("{} '{}' does not resolve, keeping dangling handle", kind, name);
        return WeakHandle::unresolved(kind, name);
    }
    handle
}

/// Write the persistable rules of `store` into `document` under
/// [`AUDIO_SWITCHES_KEY`]. Returns the number of records written.
pub fn save_audio_switches(
    store: &RuleStore,
    resolver: &dyn HandleResolver,
    settings: &SwitcherSettings,
    document: &mut Map<String, Value>,
) -> usize {
    let mut records = Vec::with_capacity(store.len());
    for rule in store {
        match AudioSwitchRecord::from_rule(rule, resolver, settings) {
            Some(record) => match serde_json::to_value(&record) {
                Ok(value) => records.push(value),
                Err(e) => warn!("Failed to encode audio switch '{}': {}", rule.display_key, e),
            },
            None => warn!(
                "Dropping audio switch '{}': scene or transition no longer exists",
                rule.display_key
            ),
        }
    }

    let count = records.len();
    document.insert(AUDIO_SWITCHES_KEY.to_string(), Value::Array(records));
    count
}

/// Read the rules stored in `document`, in order.
///
/// A missing or non-array entry yields an empty store.
pub fn load_audio_switches(
    document: &Map<String, Value>,
    resolver: &dyn HandleResolver,
    settings: &SwitcherSettings,
) -> RuleStore {
    let mut store = RuleStore::new();
    let Some(records) = document.get(AUDIO_SWITCHES_KEY).and_then(Value::as_array) else {
        return store;
    };

    for (index, value) in records.iter().enumerate() {
        if !value.is_object() {
            warn!("Audio switch record at index {} is not an object", index);
        }
        let record = AudioSwitchRecord::from_value(value, settings);
        store.add(record.into_rule(resolver, settings));
    }
    store
}

/// Save the rules held by a context
pub fn save_context(
    context: &SwitcherContext,
    resolver: &dyn HandleResolver,
    document: &mut Map<String, Value>,
) -> usize {
    let settings = context.settings();
    let snapshot = context.rules_snapshot();
    let count = save_audio_switches(&snapshot, resolver, &settings, document);
    info!("Saved {} of {} audio switches", count, snapshot.len());
    count
}

/// Replace the rules held by a context with the ones in `document`
pub fn load_context(
    context: &SwitcherContext,
    resolver: &dyn HandleResolver,
    document: &Map<String, Value>,
) -> usize {
    let settings = context.settings();
    // Resolve outside the store lock, then swap in one step
    let store = load_audio_switches(document, resolver, &settings);
    let count = store.len();
    context.replace_rules(store);
    info!("Loaded {} audio switches", count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelswitch_core::MemoryRegistry;
    use serde_json::json;

    fn registry() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.add_scene("Scene1");
        registry.add_scene("Scene2");
        registry.add_transition("Fade");
        registry.add_transition("Cut");
        registry.add_audio_source("Mic");
        registry
    }

    fn rule(registry: &MemoryRegistry, scene: &str, transition: &str, volume: f32) -> AudioRule {
        AudioRule::new(
            registry.resolve(HandleKind::AudioSource, "Mic"),
            volume,
            registry.resolve(HandleKind::Scene, scene),
            registry.resolve(HandleKind::Transition, transition),
            false,
            "Previous Scene",
        )
    }

    #[test]
    fn test_save_writes_records_in_order() {
        let registry = registry();
        let settings = SwitcherSettings::default();
        let mut store = RuleStore::new();
        store.add(rule(&registry, "Scene2", "Cut", 0.3));
        store.add(rule(&registry, "Scene1", "Fade", 0.5).with_condition(LevelCondition::Below));

        let mut document = Map::new();
        assert_eq!(save_audio_switches(&store, &registry, &settings, &mut document), 2);

        assert_eq!(
            document[AUDIO_SWITCHES_KEY],
            json!([
                {
                    "scene": "Scene2",
                    "transition": "Cut",
                    "audioSource": "Mic",
                    "volume": 0.3f32,
                    "condition": "above"
                },
                {
                    "scene": "Scene1",
                    "transition": "Fade",
                    "audioSource": "Mic",
                    "volume": 0.5,
                    "condition": "below"
                }
            ])
        );
    }

    #[test]
    fn test_save_skips_dangling_scene() {
        let registry = registry();
        let settings = SwitcherSettings::default();
        let mut store = RuleStore::new();
        store.add(rule(&registry, "Scene1", "Fade", 0.5));

        let scene_id = registry
            .resolve(HandleKind::Scene, "Scene1")
            .id()
            .expect("scene exists");
        registry.remove(scene_id);

        let mut document = Map::new();
        assert_eq!(save_audio_switches(&store, &registry, &settings, &mut document), 0);
        assert_eq!(document[AUDIO_SWITCHES_KEY], json!([]));
    }

    #[test]
    fn test_save_previous_scene_rule_without_scene() {
        let registry = registry();
        let settings = SwitcherSettings::default();
        let mut store = RuleStore::new();
        store.add(AudioRule::new(
            registry.resolve(HandleKind::AudioSource, "Mic"),
            0.5,
            WeakHandle::absent(HandleKind::Scene),
            registry.resolve(HandleKind::Transition, "Fade"),
            true,
            "Previous Scene",
        ));

        let mut document = Map::new();
        assert_eq!(save_audio_switches(&store, &registry, &settings, &mut document), 1);
        assert_eq!(document[AUDIO_SWITCHES_KEY][0]["scene"], "Previous Scene");
    }

    #[test]
    fn test_save_requires_transition() {
        let registry = registry();
        let settings = SwitcherSettings::default();
        let mut store = RuleStore::new();
        store.add(rule(&registry, "Scene1", "Missing", 0.5));

        let mut document = Map::new();
        assert_eq!(save_audio_switches(&store, &registry, &settings, &mut document), 0);
    }

    #[test]
    fn test_load_missing_array_is_empty() {
        let registry = registry();
        let store = load_audio_switches(&Map::new(), &registry, &SwitcherSettings::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_detects_previous_scene_marker() {
        let registry = registry();
        let settings = SwitcherSettings::default();
        let document = json!({
            "audioSwitches": [{ "scene": "Previous Scene", "transition": "Fade" }]
        });

        let store = load_audio_switches(
            document.as_object().expect("object"),
            &registry,
            &settings,
        );
        let loaded = &store.rules()[0];
        assert!(loaded.use_previous_scene);
        assert_eq!(loaded.display_key, "Previous Scene using Fade");
        assert!(loaded.audio_source.is_absent());
        assert_eq!(loaded.volume_threshold, 0.0);
        assert_eq!(loaded.condition, LevelCondition::Above);
    }

    #[test]
    fn test_load_is_lenient() {
        let registry = registry();
        let settings = SwitcherSettings {
            default_condition: LevelCondition::Below,
            ..Default::default()
        };
        let document = json!({
            "audioSwitches": [
                { "scene": 42, "transition": "Fade", "volume": "loud" },
                "not a record",
                { "scene": "Deleted", "transition": "Cut", "audioSource": "Mic", "volume": 0.25 }
            ]
        });

        let store = load_audio_switches(
            document.as_object().expect("object"),
            &registry,
            &settings,
        );
        assert_eq!(store.len(), 3);

        let first = &store.rules()[0];
        assert_eq!(first.display_key, " using Fade");
        assert!(first.scene.is_absent());
        assert_eq!(first.volume_threshold, 0.0);
        assert_eq!(first.condition, LevelCondition::Below);

        // A non-object element still becomes a rule, with every field empty
        let empty = &store.rules()[1];
        assert_eq!(empty.display_key, " using ");
        assert!(empty.scene.is_absent());
        assert!(empty.transition.is_absent());
        assert!(empty.audio_source.is_absent());
        assert!(!empty.use_previous_scene);
        assert_eq!(empty.condition, LevelCondition::Below);

        // Unknown scene stays on a dangling handle with its stored name
        let second = &store.rules()[2];
        assert!(second.scene.is_absent());
        assert_eq!(second.display_key, "Deleted using Cut");
        assert!(!second.audio_source.is_absent());
        assert_eq!(second.volume_threshold, 0.25);
    }

    #[test]
    fn test_context_round_trip() {
        let registry = registry();
        let context = SwitcherContext::new(SwitcherSettings::default());
        context.with_rules_mut(|rules| {
            rules.add(rule(&registry, "Scene1", "Fade", 0.5));
            rules.add(rule(&registry, "Scene2", "Cut", 0.7));
        });

        let mut document = Map::new();
        assert_eq!(save_context(&context, &registry, &mut document), 2);

        let restored = SwitcherContext::new(SwitcherSettings::default());
        restored.with_rules_mut(|rules| rules.add(rule(&registry, "Scene2", "Fade", 0.1)));
        assert_eq!(load_context(&restored, &registry, &document), 2);

        let keys: Vec<String> =
            restored.with_rules(|rules| rules.iter().map(|r| r.display_key.clone()).collect());
        assert_eq!(keys, vec!["Scene1 using Fade", "Scene2 using Cut"]);
    }
}
