//! LevelSwitch I/O - Rule Persistence
//!
//! This crate reads and writes audio switch rules:
//! - The `audioSwitches` codec over a generic JSON save document
//! - The versioned settings file (JSON or RON) that wraps the document

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod file;

pub use codec::{
    load_audio_switches, load_context, save_audio_switches, save_context, AudioSwitchRecord,
    AUDIO_SWITCHES_KEY,
};
pub use error::{IoError, Result};
pub use file::{FileMetadata, SwitcherFile, MAX_SWITCHER_FILE_SIZE, SWITCHER_FILE_VERSION};
