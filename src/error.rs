use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefineryError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column '{column}' in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Landing error in '{table}': {message}")]
    Landing { table: String, message: String },

    #[error("Validation failed for batch {batch_id}: {errors} error(s), {warnings} warning(s)")]
    ValidationFailed {
        batch_id: String,
        errors: usize,
        warnings: usize,
    },

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, RefineryError>;
