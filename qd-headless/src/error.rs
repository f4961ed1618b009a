use qd_core::QdError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can make a `qd` invocation fail
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] QdError),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(String),
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn geojson(message: impl Into<String>) -> Self {
        Self::GeoJson(message.into())
    }
}
