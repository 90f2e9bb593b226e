use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncErrorCode {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    FailedPrecondition,
    Unavailable,
    Internal,
}

impl SyncErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorCode::InvalidArgument => "sync/invalid-argument",
            SyncErrorCode::NotFound => "sync/not-found",
            SyncErrorCode::PermissionDenied => "sync/permission-denied",
            SyncErrorCode::FailedPrecondition => "sync/failed-precondition",
            SyncErrorCode::Unavailable => "sync/unavailable",
            SyncErrorCode::Internal => "sync/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncError {
    pub code: SyncErrorCode,
    message: String,
}

impl SyncError {
    pub fn new(code: SyncErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for SyncError {}

pub type SyncResult<T> = Result<T, SyncError>;

pub fn invalid_argument(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::InvalidArgument, message)
}

pub fn not_found(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::NotFound, message)
}

pub fn permission_denied(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::PermissionDenied, message)
}

pub fn failed_precondition(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::FailedPrecondition, message)
}

pub fn unavailable(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::Unavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_code() {
        let err = invalid_argument("membership filter accepts at most 10 values");
        assert_eq!(
            err.to_string(),
            "membership filter accepts at most 10 values (sync/invalid-argument)"
        );
    }

    #[test]
    fn code_strings_are_namespaced() {
        assert_eq!(SyncErrorCode::NotFound.as_str(), "sync/not-found");
        assert_eq!(
            SyncErrorCode::FailedPrecondition.as_str(),
            "sync/failed-precondition"
        );
    }
}
