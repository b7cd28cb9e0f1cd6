//! Defines the on-disk settings file for LevelSwitch.
//!
//! The file wraps the switcher settings and the generic save document (which
//! carries the `audioSwitches` array) with a format version and timestamps.
//! It is serialized to RON or JSON depending on the file extension.

use crate::codec;
use crate::error::{IoError, Result};
use chrono::{DateTime, Utc};
use levelswitch_core::{HandleResolver, SwitcherContext, SwitcherSettings};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// The current version of the settings file format.
pub const SWITCHER_FILE_VERSION: &str = "1.0.0";

/// Maximum allowed settings file size (10 MB).
pub const MAX_SWITCHER_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Top-level structure of a saved settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitcherFile {
    /// The version of the file format.
    pub version: String,
    /// Creation and modification times.
    pub metadata: FileMetadata,
    /// Engine settings.
    #[serde(default)]
    pub settings: SwitcherSettings,
    /// Generic save document holding the rule arrays.
    #[serde(default)]
    pub document: Map<String, Value>,
}

/// Metadata associated with a settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    /// Timestamp of when the file was first created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last modification.
    pub modified_at: DateTime<Utc>,
}

impl SwitcherFile {
    /// Creates a new file with empty document, stamping both times with now.
    pub fn new(settings: SwitcherSettings) -> Self {
        let now = Utc::now();
        Self {
            version: SWITCHER_FILE_VERSION.to_string(),
            metadata: FileMetadata {
                created_at: now,
                modified_at: now,
            },
            settings,
            document: Map::new(),
        }
    }

    /// Snapshot a context's settings and persistable rules.
    pub fn from_context(context: &SwitcherContext, resolver: &dyn HandleResolver) -> Self {
        let mut file = Self::new(context.settings());
        codec::save_context(context, resolver, &mut file.document);
        file
    }

    /// Push the stored settings and rules into a context.
    ///
    /// Settings go first so the previous-scene marker and default condition
    /// used while decoding rules are the stored ones. Returns the rule count.
    pub fn apply_to(&self, context: &SwitcherContext, resolver: &dyn HandleResolver) -> usize {
        let settings = self.settings.clone();
        context.update_settings(|current| *current = settings);
        let count = codec::load_context(context, resolver, &self.document);
        context.refresh_display_keys(resolver);
        count
    }

    /// Loads a file from `path`, rejecting files from other format versions.
    pub fn load(path: &Path) -> Result<Self> {
        let file = Self::load_with_limit(path, MAX_SWITCHER_FILE_SIZE)?;
        if file.version != SWITCHER_FILE_VERSION {
            return Err(IoError::VersionMismatch {
                expected: SWITCHER_FILE_VERSION.to_string(),
                found: file.version,
            });
        }
        info!("Loaded settings file {}", path.display());
        Ok(file)
    }

    /// Loads a file with a specific size limit and no version check.
    fn load_with_limit(path: &Path, limit: u64) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size > limit {
            return Err(IoError::FileTooLarge { size, limit });
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("ron");

        let mut content = String::new();
        match extension {
            "json" => {
                File::open(path)?.read_to_string(&mut content)?;
                Ok(serde_json::from_str(&content)?)
            }
            "ron" => {
                File::open(path)?.read_to_string(&mut content)?;
                Ok(ron::from_str(&content)?)
            }
            _ => Err(IoError::UnsupportedFormat(extension.to_string())),
        }
    }

    /// Saves the file to `path`, updating `modified_at`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("ron");

        self.metadata.modified_at = Utc::now();

        match extension {
            "json" => {
                let file = File::create(path)?;
                serde_json::to_writer_pretty(file, self)?;
            }
            "ron" => {
                let config = ron::ser::PrettyConfig::default();
                let s = ron::ser::to_string_pretty(self, config)?;
                let mut file = File::create(path)?;
                file.write_all(s.as_bytes())?;
            }
            _ => return Err(IoError::UnsupportedFormat(extension.to_string())),
        }

        info!("Saved settings file {}", path.display());
        Ok(())
    }
}
