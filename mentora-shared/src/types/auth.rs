use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Explicit auth context passed into every component constructor.
///
/// There is no ambient "current user": whoever builds a synchronizer or
/// resolver decides which session it acts for, which keeps ownership
/// testable without a full UI tree.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user_id: Option<Uuid>,
    access_token: Option<String>,
}

impl Session {
    /// A session with no signed-in user. Reads fall back to the
    /// publishable key; mutations are refused by callers.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            access_token: Some(access_token.into()),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn require_user(&self) -> AppResult<Uuid> {
        self.user_id
            .ok_or_else(|| AppError::not_authenticated("no signed-in user"))
    }

    /// Bearer token for the data service; `None` means callers should use
    /// the publishable key instead.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_has_no_user() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert!(session.require_user().is_err());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn user_session_exposes_id_and_token() {
        let id = Uuid::new_v4();
        let session = Session::for_user(id, "jwt-token");
        assert_eq!(session.require_user().unwrap(), id);
        assert_eq!(session.access_token(), Some("jwt-token"));
    }
}
