use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Profile;

use super::storage::{KeyValueStore, MemoryStore};

/// Storage key for the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage key for the JSON-serialized user profile
pub const USER_KEY: &str = "user";

/// An authenticated identity. The access token and the user only ever
/// exist together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Profile,
}

impl SessionData {
    pub fn new(access_token: String, refresh_token: Option<String>, user: Profile) -> Self {
        Self {
            access_token,
            refresh_token,
            user,
        }
    }
}

/// Process-wide session state backed by a durable key-value store.
///
/// Cloning yields another handle to the same session. In-memory state is
/// authoritative for the lifetime of the process; persistence is best-effort
/// and failures are logged rather than returned.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<Option<SessionData>>>,
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create an empty store on top of `backend` without reading from it.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: Arc::new(RwLock::new(None)),
            backend,
        }
    }

    /// Create a store that persists nothing beyond the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Restore the session previously saved to `backend`.
    ///
    /// A token without a readable user (or a user without a token) is not a
    /// session: the partial entries are discarded.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(backend);
        match store.read_persisted() {
            Ok(Some(data)) => {
                debug!(user_id = data.user.id, "Restored saved session");
                *store.write_state() = Some(data);
            }
            Ok(None) => debug!("No saved session found"),
            Err(e) => warn!(error = %e, "Failed to read saved session, starting signed out"),
        }
        store
    }

    /// Replace the whole session. All three fields change together.
    pub fn save(&self, data: SessionData) {
        debug!(user_id = data.user.id, "Saving session");
        *self.write_state() = Some(data.clone());
        if let Err(e) = self.persist(&data) {
            warn!(error = %e, "Failed to persist session, it will not survive a restart");
        }
    }

    /// Replace only the user, keeping both tokens. Returns false (and does
    /// nothing) when no one is signed in.
    pub fn update_user(&self, user: Profile) -> bool {
        let mut state = self.write_state();
        let Some(data) = state.as_mut() else {
            warn!("Ignoring profile update with no active session");
            return false;
        };
        data.user = user;
        let user = data.user.clone();
        drop(state);

        if let Err(e) = self.persist_user(&user) {
            warn!(error = %e, "Failed to persist updated profile");
        }
        true
    }

    /// Forget the session. Safe to call when already signed out.
    pub fn clear(&self) {
        *self.write_state() = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.backend.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted session entry");
            }
        }
        debug!("Session cleared");
    }

    /// The signed-in user's profile, if any.
    pub fn current(&self) -> Option<Profile> {
        self.read_state().as_ref().map(|d| d.user.clone())
    }

    /// True iff an access token is held. Says nothing about whether the
    /// backend still accepts it.
    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state().as_ref().map(|d| d.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_state()
            .as_ref()
            .and_then(|d| d.refresh_token.clone())
    }

    pub fn snapshot(&self) -> Option<SessionData> {
        self.read_state().clone()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<SessionData>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<SessionData>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &SessionData) -> anyhow::Result<()> {
        self.persist_user(&data.user)?;
        match data.refresh_token {
            Some(ref refresh) => self.backend.set(REFRESH_TOKEN_KEY, refresh)?,
            None => self.backend.remove(REFRESH_TOKEN_KEY)?,
        }
        self.backend.set(ACCESS_TOKEN_KEY, &data.access_token)
    }

    fn persist_user(&self, user: &Profile) -> anyhow::Result<()> {
        let json = serde_json::to_string(user)?;
        self.backend.set(USER_KEY, &json)
    }

    fn read_persisted(&self) -> anyhow::Result<Option<SessionData>> {
        let access = self.backend.get(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user = self.backend.get(USER_KEY)?;
        let refresh = self.backend.get(REFRESH_TOKEN_KEY)?.filter(|t| !t.is_empty());

        let user = user.and_then(|json| match serde_json::from_str::<Profile>(&json) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Saved profile is unreadable");
                None
            }
        });

        match (access, user) {
            (Some(access_token), Some(user)) => {
                Ok(Some(SessionData::new(access_token, refresh, user)))
            }
            (None, None) if refresh.is_none() => Ok(None),
            _ => {
                warn!("Discarding incomplete saved session");
                self.clear();
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens stay out of debug output
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("user_id", &self.current().map(|u| u.id))
            .finish()
    }
}
