//! Authentication/session state for the cloud-drive client.
//!
//! The session is an explicit context object handed to the `ApiClient` and the
//! `Router` at construction time. Every write goes to memory and to the
//! backing `KeyValueStore` so a restart picks up where the last run left off.
//! The token is zeroed in memory when cleared.

pub mod store;

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroize;

use crate::api::types::{StorageUsage, UserInfo};
use store::{KeyValueStore, MemoryStore, StoreError};

pub const TOKEN_KEY: &str = "token";
pub const USER_INFO_KEY: &str = "userInfo";
pub const STORAGE_INFO_KEY: &str = "storageInfo";

#[derive(Debug, Clone, Default, PartialEq)]
struct SessionState {
    token: Option<String>,
    user_info: Option<UserInfo>,
    storage_info: Option<StorageUsage>,
}

/// Shared session context: bearer token plus cached profile and usage.
pub struct Session {
    state: RwLock<SessionState>,
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    /// Restore a session from `store`.
    ///
    /// Cached profile entries that no longer parse are dropped rather than
    /// failing startup; the next `user_info` call refreshes them.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Arc<Self>, StoreError> {
        let token = store.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user_info = read_json(store.as_ref(), USER_INFO_KEY);
        let storage_info = read_json(store.as_ref(), STORAGE_INFO_KEY);

        if token.is_some() {
            log::info!("Restored persisted session");
        }

        Ok(Arc::new(Self {
            state: RwLock::new(SessionState {
                token,
                user_info,
                storage_info,
            }),
            store,
        }))
    }

    /// An empty session that lives only in memory.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(SessionState::default()),
            store: Arc::new(MemoryStore::new()),
        })
    }

    /// The backing store, for other origin-scoped client state.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.read(|s| s.token.is_some())
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.write(|s| {
            if let Some(ref mut old) = s.token {
                old.zeroize();
            }
            s.token = Some(token.to_string());
        });
        self.store.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StoreError> {
        self.write(|s| {
            if let Some(ref mut t) = s.token {
                t.zeroize();
            }
            s.token = None;
        });
        self.store.remove(TOKEN_KEY)
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.read(|s| s.user_info.clone())
    }

    pub fn set_user_info(&self, info: UserInfo) -> Result<(), StoreError> {
        let json = serde_json::to_string(&info)?;
        self.write(|s| s.user_info = Some(info));
        self.store.set(USER_INFO_KEY, &json)
    }

    pub fn storage_info(&self) -> Option<StorageUsage> {
        self.read(|s| s.storage_info.clone())
    }

    pub fn set_storage_info(&self, usage: StorageUsage) -> Result<(), StoreError> {
        let json = serde_json::to_string(&usage)?;
        self.write(|s| s.storage_info = Some(usage));
        self.store.set(STORAGE_INFO_KEY, &json)
    }

    /// Used space as a percentage of total space; 0 when unknown.
    pub fn storage_percentage(&self) -> f64 {
        self.read(|s| match s.storage_info {
            Some(ref usage) if usage.total_space > 0 => {
                usage.used_space as f64 / usage.total_space as f64 * 100.0
            }
            _ => 0.0,
        })
    }

    /// Drop token, profile and usage, in memory and in the store.
    ///
    /// Memory is always cleared; the first store failure is reported after
    /// every key has been attempted.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.write(|s| {
            if let Some(ref mut t) = s.token {
                t.zeroize();
            }
            *s = SessionState::default();
        });

        let mut first_error = None;
        for key in [TOKEN_KEY, USER_INFO_KEY, STORAGE_INFO_KEY] {
            if let Err(e) = self.store.remove(key) {
                log::warn!("Failed to remove {} from session store: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        log::info!("Session cleared");
        first_error.map_or(Ok(()), Err)
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write(&self, f: impl FnOnce(&mut SessionState)) {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Discarding unreadable cached {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("Failed to read cached {}: {}", key, e);
            None
        }
    }
}

/// Serialize `value` into `store` under `key`.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.set(key, &serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifecycle_is_persisted() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = Session::restore(store.clone()).unwrap();
        assert!(!session.is_logged_in());

        session.set_token("jwt-1").unwrap();
        assert_eq!(session.token().as_deref(), Some("jwt-1"));
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));

        session.clear_token().unwrap();
        assert_eq!(session.token(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_restore_reads_persisted_state() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "jwt-2").unwrap();
        store
            .set(USER_INFO_KEY, r#"{"id":3,"username":"bob"}"#)
            .unwrap();

        let session = Session::restore(store).unwrap();
        assert_eq!(session.token().as_deref(), Some("jwt-2"));
        assert_eq!(session.user_info().unwrap().username, "bob");
        assert_eq!(session.storage_info(), None);
    }

    #[test]
    fn test_restore_ignores_corrupt_cache() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(STORAGE_INFO_KEY, "{broken").unwrap();
        let session = Session::restore(store).unwrap();
        assert_eq!(session.storage_info(), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = Session::restore(store.clone()).unwrap();
        session.set_token("jwt-3").unwrap();
        session
            .set_user_info(UserInfo {
                username: "carol".into(),
                ..Default::default()
            })
            .unwrap();
        session
            .set_storage_info(StorageUsage {
                total_space: 100,
                used_space: 25,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.storage_percentage(), 25.0);

        session.clear().unwrap();
        assert!(!session.is_logged_in());
        assert_eq!(session.user_info(), None);
        assert_eq!(session.storage_percentage(), 0.0);
        for key in [TOKEN_KEY, USER_INFO_KEY, STORAGE_INFO_KEY] {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[test]
    fn test_storage_percentage_with_zero_total() {
        let session = Session::in_memory();
        session
            .set_storage_info(StorageUsage {
                total_space: 0,
                used_space: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.storage_percentage(), 0.0);
    }
}
