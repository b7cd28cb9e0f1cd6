//! Scripted host application
//!
//! Stands in for the streaming application: it owns the scenes, transitions
//! and audio sources, and replays a per-tick script of audio levels and
//! resource changes (removals and renames) from a JSON file.

use anyhow::{Context, Result};
use levelswitch_core::{
    HandleKind, HandleResolver, LevelCondition, MemoryRegistry, RuleForm, WeakHandle,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A rule entered through the editor before the run starts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptRule {
    /// Scene name or the previous-scene marker
    pub scene: String,
    /// Transition name
    pub transition: String,
    /// Audio source name
    pub audio_source: String,
    /// Trigger threshold
    pub volume: f32,
    /// Comparator, configured default if missing
    pub condition: Option<LevelCondition>,
}

impl ScriptRule {
    /// Editor form for this rule
    pub fn to_form(&self) -> RuleForm {
        RuleForm {
            scene_name: self.scene.clone(),
            transition_name: self.transition.clone(),
            audio_source_name: self.audio_source.clone(),
            volume: self.volume,
            condition: self.condition,
        }
    }
}

/// Rename of a host resource
#[derive(Debug, Clone, Deserialize)]
pub struct Rename {
    /// Current name
    pub from: String,
    /// New name
    pub to: String,
}

/// What happens on the host during one tick
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptTick {
    /// Audio source levels; sources not listed keep their level
    pub levels: BTreeMap<String, f32>,
    /// Resources deleted before this tick is evaluated
    pub remove: Vec<String>,
    /// Resources renamed before this tick is evaluated
    pub rename: Vec<Rename>,
}

impl ScriptTick {
    fn changes_resources(&self) -> bool {
        !self.remove.is_empty() || !self.rename.is_empty()
    }
}

/// Host description and timeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostScript {
    /// Scene names
    pub scenes: Vec<String>,
    /// Transition names
    pub transitions: Vec<String>,
    /// Audio-capable source names
    pub audio_sources: Vec<String>,
    /// Scene on air when the run starts
    pub start_scene: Option<String>,
    /// Rules entered before the run
    pub rules: Vec<ScriptRule>,
    /// Tick timeline
    pub ticks: Vec<ScriptTick>,
}

impl HostScript {
    /// Load a script from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid script: {}", path.display()))
    }

    /// Parse a script from JSON text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Host state driven by a [`HostScript`]
pub struct ScriptedHost {
    registry: Arc<MemoryRegistry>,
    script: HostScript,
}

impl ScriptedHost {
    /// Register every scripted resource
    pub fn new(script: HostScript) -> Self {
        let registry = Arc::new(MemoryRegistry::new());
        for name in &script.scenes {
            registry.add_scene(name.clone());
        }
        for name in &script.transitions {
            registry.add_transition(name.clone());
        }
        for name in &script.audio_sources {
            registry.add_audio_source(name.clone());
        }
        Self { registry, script }
    }

    /// Resource registry shared with the engine
    pub fn registry(&self) -> &Arc<MemoryRegistry> {
        &self.registry
    }

    /// Rules to enter through the editor
    pub fn rules(&self) -> &[ScriptRule] {
        &self.script.rules
    }

    /// Number of scripted ticks
    pub fn tick_count(&self) -> usize {
        self.script.ticks.len()
    }

    /// Handle to the starting scene, if it exists
    pub fn start_scene(&self) -> Option<WeakHandle> {
        let name = self.script.start_scene.as_deref()?;
        let handle = self.registry.resolve(HandleKind::Scene, name);
        if handle.is_absent() {
            warn!("Start scene '{}' does not exist", name);
            return None;
        }
        Some(handle)
    }

    /// Apply tick `index` to the registry.
    ///
    /// Ticks past the end of the script change nothing. Returns `true` if a
    /// resource was removed or renamed.
    pub fn apply_tick(&self, index: usize) -> bool {
        let Some(tick) = self.script.ticks.get(index) else {
            return false;
        };

        for name in &tick.remove {
            match self.find(name) {
                Some(handle) => {
                    if let Some(id) = handle.id() {
                        self.registry.remove(id);
                        debug!("Tick {}: removed {} '{}'", index, handle.kind(), name);
                    }
                }
                None => warn!("Tick {}: cannot remove unknown resource '{}'", index, name),
            }
        }

        for rename in &tick.rename {
            match self.find(&rename.from).and_then(|h| h.id()) {
                Some(id) => {
                    self.registry.rename(id, rename.to.clone());
                    debug!("Tick {}: renamed '{}' to '{}'", index, rename.from, rename.to);
                }
                None => warn!(
                    "Tick {}: cannot rename unknown resource '{}'",
                    index, rename.from
                ),
            }
        }

        for (source, level) in &tick.levels {
            if !self.registry.set_level(source, *level) {
                warn!("Tick {}: unknown audio source '{}'", index, source);
            }
        }

        tick.changes_resources()
    }

    fn find(&self, name: &str) -> Option<WeakHandle> {
        HandleKind::all()
            .iter()
            .map(|kind| self.registry.resolve(*kind, name))
            .find(|handle| !handle.is_absent())
    }
}
