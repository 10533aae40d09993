// error.rs — 核心库错误类型

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlobeError {
    /// Map asset missing or undecodable. Fatal at startup.
    #[error("failed to load map asset {path:?}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Non-positive grid resolution or output size.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A newer reprojection request replaced this one before it finished.
    #[error("reprojection superseded by a newer request")]
    Superseded,
}

pub type Result<T> = std::result::Result<T, GlobeError>;
