//! Session persistence in the OS keychain, one entry per Supabase project.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use finmanager_core::auth::{AuthError, AuthResult, AuthSession, SessionPersistence};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "finmanager-cli";

#[derive(Debug, Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn new(supabase_url: &str) -> Self {
        Self {
            username: format!(
                "supabase_session:{}",
                supabase_url.trim().trim_end_matches('/')
            ),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmanager_core::auth::AuthUser;
    use pretty_assertions::assert_eq;

    fn session(user_id: &str) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: user_id.to_string(),
                email: Some("ana@example.com".to_string()),
            },
        }
    }

    #[test]
    fn save_load_clear_cycle() {
        let store = SessionStore::new("https://cycle.supabase.co");
        assert_eq!(store.load_session().unwrap(), None);

        store.save_session(&session("owner-1")).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session("owner-1")));

        store.clear_session().unwrap();
        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
    }

    #[test]
    fn sessions_are_kept_per_project() {
        let first = SessionStore::new("https://first.supabase.co");
        let second = SessionStore::new("https://second.supabase.co");
        first.save_session(&session("owner-1")).unwrap();
        second.save_session(&session("owner-2")).unwrap();

        assert_eq!(first.load_session().unwrap(), Some(session("owner-1")));
        assert_eq!(second.load_session().unwrap(), Some(session("owner-2")));

        first.clear_session().unwrap();
        assert_eq!(first.load_session().unwrap(), None);
        assert_eq!(second.load_session().unwrap(), Some(session("owner-2")));
    }

    #[test]
    fn trailing_slash_names_the_same_entry() {
        let store = SessionStore::new("https://slash.supabase.co/");
        store.save_session(&session("owner-3")).unwrap();

        let same = SessionStore::new("https://slash.supabase.co");
        assert_eq!(same.load_session().unwrap(), Some(session("owner-3")));
    }
}
