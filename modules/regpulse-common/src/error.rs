use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegPulseError {
    #[error("Update source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
