//! Error types for Cadence

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CadenceError>;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CadenceError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CadenceError::InvalidInput(_) => 3,
            CadenceError::Config(_) => 2,
            CadenceError::Platform(PlatformError::Authentication(_)) => 2,
            CadenceError::Platform(_) => 1,
            CadenceError::Database(_) => 1,
            CadenceError::Scheduler(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

/// Errors raised by platform adapters.
///
/// The dispatcher never propagates these; they are folded into the task or
/// post result message. The variant decides whether a retry can help.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("{0} service not configured")]
    NotConfigured(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl PlatformError {
    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlatformError::Network(_)
                | PlatformError::RateLimit(_)
                | PlatformError::Posting(_)
                | PlatformError::Timeout(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Trigger '{0}' is already registered")]
    DuplicateTrigger(String),

    #[error("Unknown trigger: {0}")]
    UnknownTrigger(String),

    #[error("Scheduler is already running")]
    AlreadyRunning,
}
