//! Session sources the sync engine polls and listens to.

use std::sync::Arc;

use tokio::sync::watch;

use super::AuthSession;

/// "Current session, if any" plus a change notification.
pub trait SessionProvider: Clone + Send + Sync + 'static {
    /// The active session; expired sessions count as absent.
    fn current_session(&self) -> Option<AuthSession>;

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}

/// In-memory session slot shared by the auth client and the sync engine.
#[derive(Clone)]
pub struct SessionHandle {
    sender: Arc<watch::Sender<Option<AuthSession>>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    #[must_use]
    pub fn with_session(session: AuthSession) -> Self {
        let handle = Self::new();
        handle.set(session);
        handle
    }

    pub fn set(&self, session: AuthSession) {
        self.sender.send_replace(Some(session));
    }

    pub fn clear(&self) {
        self.sender.send_replace(None);
    }
}

impl SessionProvider for SessionHandle {
    fn current_session(&self) -> Option<AuthSession> {
        self.sender
            .borrow()
            .as_ref()
            .filter(|session| !session.is_expired())
            .cloned()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::util::unix_timestamp_now;

    fn session(expires_in: i64) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: unix_timestamp_now() + expires_in,
            user: AuthUser {
                id: "owner-1".to_string(),
                email: None,
            },
        }
    }

    #[test]
    fn empty_handle_has_no_session() {
        assert!(SessionHandle::new().current_session().is_none());
    }

    #[test]
    fn expired_session_is_treated_as_absent() {
        let handle = SessionHandle::with_session(session(-10));
        assert!(handle.current_session().is_none());

        handle.set(session(3600));
        assert_eq!(
            handle.current_session().map(|s| s.user.id),
            Some("owner-1".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscribers_see_session_changes() {
        let handle = SessionHandle::new();
        let mut receiver = handle.subscribe();

        handle.set(session(3600));
        receiver.changed().await.unwrap();
        assert!(receiver.borrow_and_update().is_some());

        handle.clear();
        receiver.changed().await.unwrap();
        assert!(receiver.borrow_and_update().is_none());
    }
}
