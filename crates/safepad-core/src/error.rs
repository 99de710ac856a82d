use thiserror::Error;

use crate::policy::PolicyViolation;

pub type SafepadResult<T> = Result<T, SafepadError>;

#[derive(Debug, Error)]
pub enum SafepadError {
    #[error("config error: {0}")]
    Config(String),

    #[error("password rejected: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("document payload error: {0}")]
    Payload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
