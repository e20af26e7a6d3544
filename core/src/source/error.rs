//! Errors surfaced by source operations.

use crate::types::SourceId;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The id is known but no installed extension provides it. Callers prompt for an install.
    #[error("source {} ({id}) is not installed", .name.as_deref().unwrap_or("unknown"))]
    NotInstalled { id: SourceId, name: Option<String> },

    #[error("source {id} does not support {operation}")]
    Unsupported { id: SourceId, operation: &'static str },

    #[error("source {id} has nothing at {key:?}")]
    NotFound { id: SourceId, key: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl SourceError {
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            Self::NotInstalled { id, .. }
            | Self::Unsupported { id, .. }
            | Self::NotFound { id, .. } => Some(*id),
            Self::Backend(_) => None,
        }
    }

    pub fn is_not_installed(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}
