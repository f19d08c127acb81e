#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration for {var}: {reason}")]
    Config { var: &'static str, reason: String },
}
