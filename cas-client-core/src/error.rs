//! CAS client error types.

use thiserror::Error;

pub type CasResult<T> = Result<T, CasError>;

/// Errors raised while configuring the client or validating a ticket.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CasError {
    /// Missing or invalid client configuration. Raised before any network access.
    #[error("{0}")]
    Configuration(String),

    /// Connection, TLS or body read failure, including oversized responses.
    #[error("{0}")]
    Transport(String),

    /// The CAS server answered with something that is not a CAS envelope.
    #[error("{0}")]
    Protocol(String),

    /// Well-formed `authenticationFailure` answer (bad, expired or reused ticket).
    #[error("Validation failed [{code}]: {message}")]
    Validation { code: String, message: String },
}

impl CasError {
    pub fn is_validation(&self) -> bool {
        matches!(self, CasError::Validation { .. })
    }
}

impl From<reqwest::Error> for CasError {
    fn from(err: reqwest::Error) -> Self {
        CasError::Transport(format!("Error while requesting ticket validation! Error: {}", err))
    }
}

impl From<url::ParseError> for CasError {
    fn from(err: url::ParseError) -> Self {
        CasError::Configuration(format!("CAS url is not valid! Error: {}", err))
    }
}
