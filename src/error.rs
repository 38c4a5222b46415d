use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config value for {name}: {value}")]
    Invalid { name: &'static str, value: f32 },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: f32) -> Self {
        ConfigError::Invalid { name, value }
    }
}

/// Failures of the external landmark source.
///
/// These are reported once when a source is created. Nothing in this crate
/// retries them.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to connect to landmark broker: {0}")]
    Connect(String),
    #[error("failed to subscribe to topic {topic}: {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("failed to open landmark recording: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed landmark message on line {line}: {source}")]
    Recording {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to read scene description: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scene description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate object id {0}")]
    DuplicateId(String),
}
