//! Weak handles to host-managed resources
//!
//! The host application owns every scene, transition and audio source. The
//! engine only keeps non-owning [`WeakHandle`]s to them: a tagged optional
//! resource id plus the name that was last seen for it. A handle may dangle at
//! any time because the host deleted the resource, so every name read goes
//! back through a [`HandleResolver`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned identity of a live resource
pub type ResourceId = u64;

/// Kind of resource a handle points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Switchable scene
    Scene,
    /// Transition effect used when switching scenes
    Transition,
    /// Source producing an audio signal
    AudioSource,
}

impl HandleKind {
    /// All kinds, in registry enumeration order
    pub fn all() -> &'static [HandleKind] {
        &[
            HandleKind::Scene,
            HandleKind::Transition,
            HandleKind::AudioSource,
        ]
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HandleKind::Scene => "scene",
            HandleKind::Transition => "transition",
            HandleKind::AudioSource => "audio source",
        };
        f.write_str(label)
    }
}

/// Non-owning reference to a host resource.
///
/// Equality compares the kind and the target id only; the cached name is a
/// display hint and never part of the identity.
#[derive(Debug, Clone)]
pub struct WeakHandle {
    kind: HandleKind,
    target: Option<ResourceId>,
    cached_name: String,
}

impl WeakHandle {
    /// A handle that points at nothing
    pub fn absent(kind: HandleKind) -> Self {
        Self {
            kind,
            target: None,
            cached_name: String::new(),
        }
    }

    /// A handle whose name is known but did not resolve
    pub fn unresolved(kind: HandleKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            target: None,
            cached_name: name.into(),
        }
    }

    /// A handle to a resolved resource
    pub fn new(kind: HandleKind, id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            kind,
            target: Some(id),
            cached_name: name.into(),
        }
    }

    /// Kind of the referenced resource
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Target id, if the handle was ever resolved
    pub fn id(&self) -> Option<ResourceId> {
        self.target
    }

    /// True if resolution failed when the handle was created
    pub fn is_absent(&self) -> bool {
        self.target.is_none()
    }

    /// Last name seen for this resource (may be stale)
    pub fn cached_name(&self) -> &str {
        &self.cached_name
    }

    /// Current name of the resource, `None` if the handle dangles
    pub fn name(&self, resolver: &dyn HandleResolver) -> Option<String> {
        resolver.name_of(self)
    }

    /// Re-read the name from the host and update the cache.
    ///
    /// Returns `false` if the handle is absent or dangling; the cached name is
    /// left untouched in that case.
    pub fn refresh(&mut self, resolver: &dyn HandleResolver) -> bool {
        match resolver.name_of(self) {
            Some(name) => {
                self.cached_name = name;
                true
            }
            None => false,
        }
    }

    /// True if both handles point at the same live target
    pub fn same_target(&self, other: &WeakHandle) -> bool {
        self.kind == other.kind && self.target.is_some() && self.target == other.target
    }
}

impl PartialEq for WeakHandle {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.target == other.target
    }
}

impl Eq for WeakHandle {}

/// Name-to-handle resolution provided by the host registry.
///
/// Resolution never fails loudly: unknown names yield an absent handle and
/// dangling handles yield `None` names.
pub trait HandleResolver: Send + Sync {
    /// Resolve a name to a weak handle of the given kind
    fn resolve(&self, kind: HandleKind, name: &str) -> WeakHandle;

    /// Current name of the handle's target, `None` if absent or dangling
    fn name_of(&self, handle: &WeakHandle) -> Option<String>;

    /// Names of all live resources of a kind, in host order
    fn names(&self, kind: HandleKind) -> Vec<String>;

    /// Names of every audio-capable source
    fn audio_sources(&self) -> Vec<String> {
        self.names(HandleKind::AudioSource)
    }
}

/// Instantaneous audio level readout
pub trait LevelMeter: Send + Sync {
    /// Current level of an audio source, `None` if the handle dangles
    fn level(&self, source: &WeakHandle) -> Option<f32>;
}
