use serde::{Deserialize, Serialize};

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth/session errors
/// - E2xxx: Remote data service errors
/// - E3xxx: Realtime subscription errors
/// - E4xxx: Function invocation errors
/// - E5xxx: Storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ConfigMissing,
    SerializationError,

    // Auth (E1xxx)
    NotAuthenticated,
    PermissionDenied,

    // Data service (E2xxx)
    RowNotFound,
    QueryFailed,
    UpdateFailed,

    // Realtime (E3xxx)
    StreamDisconnected,

    // Functions (E4xxx)
    FunctionFailed,

    // Storage (E5xxx)
    BucketCreateFailed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ConfigMissing => "E0002",
            Self::SerializationError => "E0003",

            // Auth
            Self::NotAuthenticated => "E1001",
            Self::PermissionDenied => "E1002",

            // Data service
            Self::RowNotFound => "E2001",
            Self::QueryFailed => "E2002",
            Self::UpdateFailed => "E2003",

            // Realtime
            Self::StreamDisconnected => "E3001",

            // Functions
            Self::FunctionFailed => "E4001",

            // Storage
            Self::BucketCreateFailed => "E5001",
        }
    }

    /// Short human-readable message suitable for a transient UI notification.
    /// Raw backend error bodies never reach the display layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InternalError => "Something went wrong. Please try again.",
            Self::ConfigMissing => "The app is not configured correctly.",
            Self::SerializationError => "Received an unexpected response.",
            Self::NotAuthenticated => "Please sign in to continue.",
            Self::PermissionDenied => "You don't have permission to do that.",
            Self::RowNotFound => "That item could not be found.",
            Self::QueryFailed => "Could not load data. Please try again.",
            Self::UpdateFailed => "Could not save your change. Please try again.",
            Self::StreamDisconnected => "Lost connection to live updates.",
            Self::FunctionFailed => "The request could not be completed.",
            Self::BucketCreateFailed => "Storage is unavailable right now.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAuthenticated, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RowNotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigMissing, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Known { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Http(_) => ErrorCode::QueryFailed,
            Self::Json(_) => ErrorCode::SerializationError,
        }
    }

    /// Not-found is normalized to an absent result by callers, never shown
    /// as a user-facing error.
    pub fn is_not_found(&self) -> bool {
        self.error_code() == ErrorCode::RowNotFound
    }

    /// Convert to a short display message, logging the diagnostic detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Known { code, message, .. } => {
                tracing::warn!(code = code.code(), detail = %message, "surfacing error to user");
                code.user_message().to_string()
            }
            other => {
                tracing::warn!(error = %other, "surfacing error to user");
                other.error_code().user_message().to_string()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
