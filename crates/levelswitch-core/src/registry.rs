//! In-process resource registry
//!
//! [`MemoryRegistry`] stands in for the host application's source registry:
//! it owns named scenes, transitions and audio sources, hands out weak
//! handles to them and stores the latest level of each audio source. It is
//! used by the command-line runner and by tests.

use crate::handle::{HandleKind, HandleResolver, LevelMeter, ResourceId, WeakHandle};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Resource {
    id: ResourceId,
    kind: HandleKind,
    name: String,
    level: f32,
}

#[derive(Debug)]
struct RegistryInner {
    resources: Vec<Resource>,
    next_id: ResourceId,
}

/// Thread-safe registry of live host resources
#[derive(Debug)]
pub struct MemoryRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                resources: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Register a resource. Names are unique per kind; registering an existing
    /// name returns the id already in use.
    pub fn add(&self, kind: HandleKind, name: impl Into<String>) -> ResourceId {
        let name = name.into();
        let mut inner = self.inner.write();
        if let Some(existing) = inner
            .resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
        {
            debug!("{} '{}' already registered", kind, name);
            return existing.id;
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.resources.push(Resource {
            id,
            kind,
            name,
            level: 0.0,
        });
        id
    }

    /// Register a scene
    pub fn add_scene(&self, name: impl Into<String>) -> ResourceId {
        self.add(HandleKind::Scene, name)
    }

    /// Register a transition
    pub fn add_transition(&self, name: impl Into<String>) -> ResourceId {
        self.add(HandleKind::Transition, name)
    }

    /// Register an audio source
    pub fn add_audio_source(&self, name: impl Into<String>) -> ResourceId {
        self.add(HandleKind::AudioSource, name)
    }

    /// Delete a resource. Handles to it dangle from now on.
    pub fn remove(&self, id: ResourceId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.resources.len();
        inner.resources.retain(|r| r.id != id);
        inner.resources.len() != before
    }

    /// Rename a resource in place; existing handles stay valid
    pub fn rename(&self, id: ResourceId, new_name: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        match inner.resources.iter_mut().find(|r| r.id == id) {
            Some(resource) => {
                resource.name = new_name.into();
                true
            }
            None => false,
        }
    }

    /// Set the current level of an audio source by name
    pub fn set_level(&self, source_name: &str, level: f32) -> bool {
        let mut inner = self.inner.write();
        match inner
            .resources
            .iter_mut()
            .find(|r| r.kind == HandleKind::AudioSource && r.name == source_name)
        {
            Some(resource) => {
                resource.level = level;
                true
            }
            None => false,
        }
    }

    /// Number of live resources
    pub fn len(&self) -> usize {
        self.inner.read().resources.len()
    }

    /// Check if the registry holds nothing
    pub fn is_empty(&self) -> bool {
        self.inner.read().resources.is_empty()
    }
}

impl HandleResolver for MemoryRegistry {
    fn resolve(&self, kind: HandleKind, name: &str) -> WeakHandle {
        if name.is_empty() {
            return WeakHandle::absent(kind);
        }
        let inner = self.inner.read();
        inner
            .resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
            .map(|r| WeakHandle::new(kind, r.id, r.name.clone()))
            .unwrap_or_else(|| WeakHandle::absent(kind))
    }

    fn name_of(&self, handle: &WeakHandle) -> Option<String> {
        let id = handle.id()?;
        let inner = self.inner.read();
        inner
            .resources
            .iter()
            .find(|r| r.id == id && r.kind == handle.kind())
            .map(|r| r.name.clone())
    }

    fn names(&self, kind: HandleKind) -> Vec<String> {
        self.inner
            .read()
            .resources
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.name.clone())
            .collect()
    }
}

impl LevelMeter for MemoryRegistry {
    fn level(&self, source: &WeakHandle) -> Option<f32> {
        if source.kind() != HandleKind::AudioSource {
            return None;
        }
        let id = source.id()?;
        self.inner
            .read()
            .resources
            .iter()
            .find(|r| r.id == id && r.kind == HandleKind::AudioSource)
            .map(|r| r.level)
    }
}
