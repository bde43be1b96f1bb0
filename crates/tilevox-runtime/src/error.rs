use std::fmt;

use tilevox_atlas::AtlasError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A model did not fit the atlas; the configured atlas is too small for the content.
    Atlas(AtlasError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Atlas(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Atlas(err) => Some(err),
        }
    }
}

impl From<AtlasError> for EngineError {
    fn from(err: AtlasError) -> Self {
        EngineError::Atlas(err)
    }
}
