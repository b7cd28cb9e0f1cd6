//! Switcher engine context
//!
//! [`SwitcherContext`] owns the rule store, the scene tracker and the
//! settings. It is created once by the application and shared through an
//! `Arc` with the editor and the background evaluation loop. Each piece of
//! state sits behind its own lock and no method holds two of them at once.

use crate::handle::{HandleResolver, LevelMeter, WeakHandle};
use crate::matcher::{self, MatchInput, SwitchDirective};
use crate::rule::RuleId;
use crate::settings::SwitcherSettings;
use crate::store::RuleStore;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Tracks the scene on air and the one before it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneTracker {
    current: Option<WeakHandle>,
    previous: Option<WeakHandle>,
}

impl SceneTracker {
    /// Create a tracker with no scene history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scene change. Re-entering the current scene is a no-op.
    pub fn on_scene_changed(&mut self, scene: WeakHandle) -> bool {
        if self.current.as_ref().is_some_and(|c| c.same_target(&scene)) {
            return false;
        }
        self.previous = self.current.take();
        self.current = Some(scene);
        true
    }

    /// Scene on air
    pub fn current(&self) -> Option<&WeakHandle> {
        self.current.as_ref()
    }

    /// Scene before the current one
    pub fn previous(&self) -> Option<&WeakHandle> {
        self.previous.as_ref()
    }
}

/// Shared engine state for the editor and the evaluation loop
#[derive(Debug, Default)]
pub struct SwitcherContext {
    rules: Mutex<RuleStore>,
    scenes: Mutex<SceneTracker>,
    settings: RwLock<SwitcherSettings>,
}

impl SwitcherContext {
    /// Create a context with an empty rule store
    pub fn new(settings: SwitcherSettings) -> Self {
        Self {
            rules: Mutex::new(RuleStore::new()),
            scenes: Mutex::new(SceneTracker::new()),
            settings: RwLock::new(settings),
        }
    }

    /// Run `f` with the store locked for reading
    pub fn with_rules<R>(&self, f: impl FnOnce(&RuleStore) -> R) -> R {
        let rules = self.rules.lock();
        f(&rules)
    }

    /// Run `f` with the store locked for writing
    pub fn with_rules_mut<R>(&self, f: impl FnOnce(&mut RuleStore) -> R) -> R {
        let mut rules = self.rules.lock();
        f(&mut rules)
    }

    /// Replace every rule with the ones in `store` (used by load).
    ///
    /// The incoming rules are renumbered from the live store's counter, so
    /// ids handed out before the load never come back.
    pub fn replace_rules(&self, store: RuleStore) -> Vec<RuleId> {
        self.rules.lock().replace_all(store)
    }

    /// Snapshot of the store
    pub fn rules_snapshot(&self) -> RuleStore {
        self.rules.lock().clone()
    }

    /// Number of rules
    pub fn rule_count(&self) -> usize {
        self.rules.lock().len()
    }

    /// Copy of the current settings
    pub fn settings(&self) -> SwitcherSettings {
        self.settings.read().clone()
    }

    /// Modify the settings in place
    pub fn update_settings(&self, f: impl FnOnce(&mut SwitcherSettings)) {
        f(&mut self.settings.write());
    }

    /// Scene on air, if known
    pub fn current_scene(&self) -> Option<WeakHandle> {
        self.scenes.lock().current().cloned()
    }

    /// Scene before the current one, if known
    pub fn previous_scene(&self) -> Option<WeakHandle> {
        self.scenes.lock().previous().cloned()
    }

    /// Host notification that the scene on air changed
    pub fn set_current_scene(&self, scene: WeakHandle) -> bool {
        self.scenes.lock().on_scene_changed(scene)
    }

    /// Rebuild every rule's display key from current host names
    pub fn refresh_display_keys(&self, resolver: &dyn HandleResolver) {
        let previous_scene_name = self.settings.read().previous_scene_name.clone();
        self.rules
            .lock()
            .refresh_display_keys(resolver, &previous_scene_name);
    }

    /// One evaluation tick of the audio rules.
    ///
    /// Returns the switch requested by the first matching rule, if any.
    pub fn check_audio_switch(&self, meter: &dyn LevelMeter) -> Option<SwitchDirective> {
        if self.rules.lock().is_empty() {
            return None;
        }

        let (current, previous) = {
            let scenes = self.scenes.lock();
            (scenes.current().cloned(), scenes.previous().cloned())
        };
        let input = MatchInput {
            meter,
            current_scene: current.as_ref(),
            previous_scene: previous.as_ref(),
        };

        let directive = {
            let rules = self.rules.lock();
            matcher::evaluate_audio(rules.rules(), &input)
        };

        if let Some(directive) = &directive {
            if self.settings.read().verbose {
                info!("Audio match: rule {}", directive.rule_id);
            } else {
                debug!("Audio match: rule {}", directive.rule_id);
            }
        }
        directive
    }

    /// Execute a directive against the scene tracker.
    ///
    /// Returns `false` if the target scene dangles or is already on air.
    pub fn apply_switch(&self, directive: &SwitchDirective, resolver: &dyn HandleResolver) -> bool {
        let Some(scene_name) = resolver.name_of(&directive.scene) else {
            warn!(
                "Rule {} targets a scene that no longer exists ('{}')",
                directive.rule_id,
                directive.scene.cached_name()
            );
            return false;
        };

        if !self.set_current_scene(directive.scene.clone()) {
            debug!("Scene '{}' already active", scene_name);
            return false;
        }

        let transition_name = resolver
            .name_of(&directive.transition)
            .unwrap_or_else(|| "default transition".to_string());
        info!("Switched to scene '{}' using {}", scene_name, transition_name);
        true
    }
}
