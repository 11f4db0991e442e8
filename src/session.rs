//! Session State
//!
//! Per-session record of which identity, if any, is signed in, plus the
//! server-side store that maps session tokens to that record.

use crate::config::IdentityConfig;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::Identity;

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Session token length in bytes before hex encoding
const TOKEN_BYTES: usize = 32;

/// Identity tracked by one session
///
/// Holds the signed-in id and nothing else. Signing out removes the session, so
/// the next request starts from the empty default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub user_id: Option<i64>,
}

impl SessionState {
    pub fn signed_in(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

/// Resolve the identity a session currently refers to
///
/// A session pointing at an identity that no longer exists resolves to `None`.
/// Nothing is cached between calls.
pub async fn resolve_current_identity(
    session: &SessionState,
    directory: &dyn UserDirectory,
) -> Result<Option<Identity>, AuthError> {
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };

    let identity = directory.find_by_id(user_id).await?;
    if identity.is_none() {
        tracing::debug!(user_id, "Session refers to a removed identity");
    }

    Ok(identity)
}

/// In-process session store keyed by opaque token
///
/// Entries live for a fixed TTL from the moment they are established. Expired
/// entries are dropped lazily on `load` and swept on every `establish`; at capacity
/// the oldest entry is evicted.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
    capacity: usize,
}

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    state: SessionState,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(
            Duration::from_secs(config.session_ttl_secs),
            config.max_sessions,
        )
    }

    /// State of a live session; an expired token is dropped and reads as unknown
    pub async fn load(&self, token: &str) -> Option<SessionState> {
        let now = Instant::now();

        let entry = self.sessions.read().await.get(token).copied()?;
        if entry.is_live(now) {
            return Some(entry.state);
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(token).is_some_and(|entry| !entry.is_live(now)) {
            sessions.remove(token);
            tracing::debug!("Dropped expired session");
        }
        None
    }

    /// Start a fresh session holding `state`, dropping `previous` if given
    ///
    /// Called whenever a session gains an identity so the pre-signin token is never
    /// reused.
    pub async fn establish(
        &self,
        previous: Option<&str>,
        state: SessionState,
    ) -> Result<String, AuthError> {
        let token = generate_token()?;
        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).ok_or_else(|| {
            tracing::error!(ttl = ?self.ttl, "Session TTL overflows the clock");
            AuthError::Internal
        })?;

        let mut sessions = self.sessions.write().await;
        if let Some(previous) = previous {
            sessions.remove(previous);
        }

        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_live(now));
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "Swept expired sessions");
        }

        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(token, _)| token.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::warn!(
                    capacity = self.capacity,
                    "Session store full, evicted oldest session"
                );
            }
        }

        sessions.insert(token.clone(), SessionEntry { state, expires_at });

        Ok(token)
    }

    /// Drop a session, returning its state if it was still live
    pub async fn remove(&self, token: &str) -> Option<SessionState> {
        let entry = self.sessions.write().await.remove(token)?;
        entry.is_live(Instant::now()).then_some(entry.state)
    }

    /// Stored entries, including expired ones not yet swept
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!("Entropy source failed: {:?}", e);
        AuthError::Internal
    })?;
    Ok(hex::encode(bytes))
}
