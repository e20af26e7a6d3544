//! Persistent key-value preferences.

pub mod preferences;

pub use preferences::{JsonPreferences, MemoryPreferences, PreferenceStore};

pub type Result<T> = crate::Result<T>;
