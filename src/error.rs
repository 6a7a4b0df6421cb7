use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// No credential, or the gateway client could not be built.
    #[error("AI analysis unavailable: {0}")]
    ConfigurationUnavailable(String),

    /// Upstream model call failed; the message is shown to callers verbatim.
    #[error("{0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}
