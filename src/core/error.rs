use thiserror::Error;

/// Gateway-wide error model shared by the client session and the server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("empty query")]
    EmptyQuery,
    #[error("could not determine appropriate tool")]
    NoMatch,
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Application(String),
    #[error("{0}")]
    Precondition(String),
}

impl GatewayError {
    /// Errors that must abort the whole session rather than one query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Precondition(_))
    }
}
