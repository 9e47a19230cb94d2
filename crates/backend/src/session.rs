//! Signed-in session context.
//!
//! A [`Session`] is created at sign-in and handed to whatever needs the
//! authenticated user. Signing out cancels every fetch that was issued with
//! one of the session's child tokens.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

/// Scoped authentication context. Cheap to clone; clones share the lifecycle.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    user: UserIdentity,
    token: String,
    signed_in_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Session {
    /// Starts a session for `user` authenticated by `token`.
    pub fn sign_in(user: UserIdentity, token: impl Into<String>) -> Self {
        info!(user = %user.name, "signed in");
        Self {
            inner: Arc::new(SessionInner {
                user,
                token: token.into(),
                signed_in_at: Utc::now(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn user(&self) -> &UserIdentity {
        &self.inner.user
    }

    /// Bearer token for API requests.
    pub fn token(&self) -> &str {
        &self.inner.token
    }

    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.inner.signed_in_at
    }

    pub fn is_active(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    /// Token for one fetch. Cancelled by its owner or at sign-out.
    pub fn child_token(&self) -> CancellationToken {
        self.inner.cancel.child_token()
    }

    /// Ends the session for every clone and cancels outstanding fetches.
    pub fn sign_out(&self) {
        if self.is_active() {
            info!(user = %self.inner.user.name, "signed out");
            self.inner.cancel.cancel();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.inner.user)
            .field("token", &"<redacted>")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::sign_in(
            UserIdentity {
                id: "u1".into(),
                name: "ada".into(),
            },
            "secret-token",
        )
    }

    #[test]
    fn new_session_is_active() {
        let s = session();
        assert!(s.is_active());
        assert_eq!(s.user().name, "ada");
        assert_eq!(s.token(), "secret-token");
    }

    #[test]
    fn sign_out_cancels_children_and_clones() {
        let s = session();
        let clone = s.clone();
        let child = s.child_token();

        clone.sign_out();

        assert!(!s.is_active());
        assert!(child.is_cancelled());
        // Tokens issued after sign-out are born cancelled.
        assert!(s.child_token().is_cancelled());
    }

    #[test]
    fn child_cancel_does_not_end_session() {
        let s = session();
        let child = s.child_token();
        child.cancel();
        assert!(s.is_active());
    }

    #[test]
    fn debug_redacts_token() {
        let dbg = format!("{:?}", session());
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("redacted"));
    }
}
