/// Rejection of a workspace operation. Every variant is raised before any
/// state has been touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Bad ids, bad lengths, wrong state. Maps to HTTP 400.
    #[error("{0}")]
    InvalidInput(String),

    /// The actor is not allowed to do this. Maps to HTTP 403.
    #[error("{0}")]
    AccessDenied(String),

    /// Unknown, expired or logged-out session. Maps to HTTP 403.
    #[error("invalid token")]
    InvalidToken,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidInput(msg.into())
}

pub(crate) fn denied(msg: impl Into<String>) -> Error {
    Error::AccessDenied(msg.into())
}
