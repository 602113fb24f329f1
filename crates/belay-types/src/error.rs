use thiserror::Error;

/// Failures surfaced by the credential, channel and ledger components.
///
/// Display strings are safe to show to a caller: store internals never end up
/// in here, they are logged where they happen and collapsed into
/// [`BelayError::StoreUnavailable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BelayError {
    #[error("{0} is taken")]
    NameTaken(String),

    /// Unknown user and wrong password both land here.
    #[error("user and pass combo not correct")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(String),

    #[error("undefined channel")]
    InvalidChannel,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("{0}")]
    InvalidInput(String),

    #[error("service unavailable")]
    StoreUnavailable,
}
