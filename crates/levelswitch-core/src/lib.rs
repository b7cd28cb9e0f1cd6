//! LevelSwitch Core - Audio-Level Scene Switching
//!
//! This crate contains the rule engine that switches scenes when the level of
//! an audio source crosses a threshold:
//! - Weak handles to host resources and the resolver capability
//! - Audio rules and the ordered rule store
//! - First-match-wins rule matching against live levels
//! - The shared engine context used by the editor and the evaluation loop
//! - The list-based rule editor model
//! - Settings and logging configuration

#![warn(missing_docs)]

use thiserror::Error;

pub mod editor;
pub mod engine;
pub mod handle;
pub mod logging;
pub mod matcher;
pub mod registry;
pub mod rule;
pub mod settings;
pub mod store;

// --- Re-exports grouped by category ---

// Host resources
pub use handle::{HandleKind, HandleResolver, LevelMeter, ResourceId, WeakHandle};
pub use registry::MemoryRegistry;

// Rules & matching
pub use matcher::{MatchInput, SwitchDirective, SwitchRule};
pub use rule::{make_display_key, AudioRule, LevelCondition, RuleId};
pub use store::RuleStore;

// Engine & editing
pub use editor::{EditOutcome, ListRow, RowDetails, RuleEditor, RuleForm};
pub use engine::{SceneTracker, SwitcherContext};

// Configuration
pub use logging::LogConfig;
pub use settings::{SwitcherSettings, DEFAULT_CHECK_INTERVAL_MS, PREVIOUS_SCENE_NAME};

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Editor input cannot form a rule
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
