//! # AppError
//!
//! Centralized error handling for the Connectify services.
//! Maps domain-specific failures to the four kinds clients see.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// The client-facing taxonomy every `AppError` collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadUserInput,
    NotFound,
    AuthenticationError,
    UnknownError,
}

/// Rejected friend-protocol transitions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipError {
    #[error("you cannot send a friend request to yourself")]
    InvalidRequest,

    #[error("you are already friends")]
    AlreadyFriends,

    #[error("a friend request is already pending")]
    AlreadyPending,

    /// The peer already asked the caller; accepting is the only way forward.
    #[error("this user has already sent you a friend request")]
    IncomingRequestExists,

    #[error("no such friend request")]
    NoSuchRequest,
}

impl FriendshipError {
    pub fn reason(&self) -> &'static str {
        match self {
            FriendshipError::InvalidRequest => "INVALID_REQUEST",
            FriendshipError::AlreadyFriends => "ALREADY_FRIENDS",
            FriendshipError::AlreadyPending => "ALREADY_PENDING",
            FriendshipError::IncomingRequestExists => "INCOMING_REQUEST_EXISTS",
            FriendshipError::NoSuchRequest => "NO_SUCH_REQUEST",
        }
    }
}

/// The primary error type for all cf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., User, Thread, Entry, Post)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// One or more input fields failed validation
    #[error("validation error: {0}")]
    ValidationError(ValidationErrors),

    #[error(transparent)]
    Friendship(#[from] FriendshipError),

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unique field already taken (e.g., duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A document changed between load and save
    #[error("document {0} was modified concurrently")]
    VersionConflict(String),

    /// Infrastructure failure (e.g., DB down, template error)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) | AppError::Friendship(_) | AppError::Conflict(_) => {
                ErrorKind::BadUserInput
            }
            AppError::NotFound(..) => ErrorKind::NotFound,
            AppError::Unauthorized(_) => ErrorKind::AuthenticationError,
            AppError::VersionConflict(_) | AppError::Internal(_) => ErrorKind::UnknownError,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for Connectify logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendship_errors_are_bad_input() {
        let err: AppError = FriendshipError::AlreadyFriends.into();
        assert_eq!(err.kind(), ErrorKind::BadUserInput);
        assert_eq!(err.to_string(), "you are already friends");
    }

    #[test]
    fn anyhow_errors_keep_their_message() {
        let err: AppError = anyhow::anyhow!("smtp refused").into();
        assert_eq!(err.kind(), ErrorKind::UnknownError);
        assert!(err.to_string().contains("smtp refused"));
    }

    #[test]
    fn not_found_formats_kind_and_id() {
        let err = AppError::not_found("Thread", "abc");
        assert_eq!(err.to_string(), "Thread not found with ID abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
