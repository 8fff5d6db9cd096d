//! Server-side sessions on `tower-sessions`.
//!
//! The browser only holds the signed `tabletalk.sid` cookie. The access
//! token, the pending OAuth `state` and the last result set live in
//! [`MemorySessionStore`], and a session ends after a period of inactivity.
//! To move sessions out of process memory, implement
//! [`tower_sessions::SessionStore`] for another backend and change the
//! concrete type in [`crate::state::AppState`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tabletalk_relay::{AccessToken, Row};
use thiserror::Error;
use time::OffsetDateTime;
use tower_sessions::cookie::Key;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion};
use tower_sessions::{Session, SessionStore};

pub const SESSION_COOKIE: &str = "tabletalk.sid";

/// Key of the single [`SessionData`] entry inside a session record.
const DATA_KEY: &str = "tabletalk";

/// Everything kept for one browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: Option<AccessToken>,
    /// Anti-forgery value sent with the consent redirect; consumed by the
    /// callback.
    pub oauth_state: Option<String>,
    pub last_results: Option<Vec<Row>>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Cookie signing key derived from `SESSION_SECRET`.
pub fn cookie_key(secret: &str) -> Key {
    // SHA-512 yields exactly the 64 bytes `Key::from` requires.
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

/// The caller's session, typed as [`SessionData`].
#[derive(Debug, Clone)]
pub struct UserSession(Session);

impl UserSession {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub fn id(&self) -> Option<Id> {
        self.0.id()
    }

    /// Current data; a new session reads as [`SessionData::default`].
    pub async fn get(&self) -> Result<SessionData, SessionError> {
        Ok(self.0.get(DATA_KEY).await?.unwrap_or_default())
    }

    pub async fn set(&self, data: SessionData) -> Result<(), SessionError> {
        self.0.insert(DATA_KEY, data).await?;
        Ok(())
    }

    /// Apply `f` to the session data in one read-modify-write.
    pub async fn update<F>(&self, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionData),
    {
        let mut data = self.get().await?;
        f(&mut data);
        self.set(data).await
    }

    /// Delete the record from the store and expire the cookie.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        self.0.flush().await?;
        Ok(())
    }

    pub async fn access_token(&self) -> Result<Option<AccessToken>, SessionError> {
        Ok(self.get().await?.access_token)
    }
}

impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self)
    }
}

/// Process-local session store.
///
/// Expired records are never loaded and are removed by
/// [`ExpiredDeletion::delete_expired`]. `save` only updates records that
/// still exist, so a request finishing after a logout cannot bring the
/// session back.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
}

impl fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.records.lock().map(|r| r.len()).unwrap_or(0);
        write!(f, "MemorySessionStore({count} sessions)")
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> session_store::Result<MutexGuard<'_, HashMap<Id, Record>>> {
        self.records
            .lock()
            .map_err(|_| session_store::Error::Backend("session store lock poisoned".into()))
    }

    /// Poison the lock so every later call fails.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.records.lock();
            panic!("poisoning session store for a test");
        }));
    }

    /// Data of every stored session, expired or not.
    #[cfg(test)]
    pub(crate) fn all_data(&self) -> Vec<SessionData> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter_map(|r| r.data.get(DATA_KEY).cloned())
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

fn is_active(expiry_date: OffsetDateTime) -> bool {
    expiry_date > OffsetDateTime::now_utc()
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.lock()?;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let mut records = self.lock()?;
        if let Some(existing) = records.get_mut(&record.id) {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let records = self.lock()?;
        Ok(records
            .get(id)
            .filter(|r| is_active(r.expiry_date))
            .cloned())
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.lock()?.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for MemorySessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        self.lock()?.retain(|_, r| is_active(r.expiry_date));
        Ok(())
    }
}
