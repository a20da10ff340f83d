use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("target resolution error: {0}")]
    Resolution(String),

    #[error("remote service error: {0}")]
    Remote(String),

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("comment template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, Error>;
