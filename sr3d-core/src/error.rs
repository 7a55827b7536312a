/// Error types for mesh loading, scene editing and configuration
use std::path::PathBuf;

/// Errors produced while supplying a mesh to the scene
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("mesh '{0}' has no vertices")]
    Empty(String),

    #[error("unsupported mesh format: {0}")]
    UnsupportedFormat(String),
}

impl MeshError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Errors produced by scene graph operations
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("no node named '{0}'")]
    NodeNotFound(String),

    #[error("the root node cannot be deleted or re-parented")]
    RootNotDeletable,

    #[error("cannot attach '{child}' below its own descendant '{parent}'")]
    WouldCycle { child: String, parent: String },

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Errors produced while loading a render configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}
