use crate::codec::DecodeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubgenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode failed for {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: DecodeError,
    },

    #[error("Resource {url} unavailable: {reason}")]
    Resource { url: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl SubgenError {
    pub fn resource(url: impl Into<String>, reason: impl ToString) -> Self {
        SubgenError::Resource {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubgenError>;
