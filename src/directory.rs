//! User Directory
//!
//! Persistence capability for identities. The auth core only needs lookup and
//! creation; update and removal back the generic identity endpoints.

use crate::error::AuthError;
use crate::models::{Identity, IdentityUpdate};
use crate::password::PasswordRecord;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Identity storage
///
/// Implementations must enforce email uniqueness themselves and report a
/// collision as [`AuthError::DuplicateIdentity`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All identities registered under `email`
    async fn find_by_email(&self, email: &str) -> Result<Vec<Identity>, AuthError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, AuthError>;

    /// Every identity, ordered by id
    async fn find_all(&self) -> Result<Vec<Identity>, AuthError>;

    /// Persist a new identity and assign its id
    async fn create(&self, email: &str, credential: PasswordRecord) -> Result<Identity, AuthError>;

    /// Apply a partial change, returning the updated identity
    async fn update(&self, id: i64, changes: IdentityUpdate) -> Result<Identity, AuthError>;

    /// Delete an identity, returning what was removed
    async fn remove(&self, id: i64) -> Result<Identity, AuthError>;
}

/// Process-local directory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    next_id: i64,
    identities: Vec<Identity>,
}

impl Entries {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.identities
            .iter()
            .any(|identity| identity.email == email && Some(identity.id) != except)
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Vec<Identity>, AuthError> {
        let entries = self.inner.read().await;
        Ok(entries
            .identities
            .iter()
            .filter(|identity| identity.email == email)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, AuthError> {
        let entries = self.inner.read().await;
        Ok(entries
            .identities
            .iter()
            .find(|identity| identity.id == id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Identity>, AuthError> {
        Ok(self.inner.read().await.identities.clone())
    }

    async fn create(&self, email: &str, credential: PasswordRecord) -> Result<Identity, AuthError> {
        let mut entries = self.inner.write().await;

        if entries.email_taken(email, None) {
            return Err(AuthError::DuplicateIdentity);
        }

        entries.next_id += 1;
        let identity = Identity {
            id: entries.next_id,
            email: email.to_string(),
            credential,
        };
        entries.identities.push(identity.clone());

        Ok(identity)
    }

    async fn update(&self, id: i64, changes: IdentityUpdate) -> Result<Identity, AuthError> {
        let mut entries = self.inner.write().await;

        if let Some(email) = &changes.email {
            if entries.email_taken(email, Some(id)) {
                return Err(AuthError::DuplicateIdentity);
            }
        }

        let identity = entries
            .identities
            .iter_mut()
            .find(|identity| identity.id == id)
            .ok_or(AuthError::UserNotFound(id))?;

        if let Some(email) = changes.email {
            identity.email = email;
        }
        if let Some(credential) = changes.credential {
            identity.credential = credential;
        }

        Ok(identity.clone())
    }

    async fn remove(&self, id: i64) -> Result<Identity, AuthError> {
        let mut entries = self.inner.write().await;

        let index = entries
            .identities
            .iter()
            .position(|identity| identity.id == id)
            .ok_or(AuthError::UserNotFound(id))?;

        Ok(entries.identities.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(s: &str) -> PasswordRecord {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let directory = InMemoryDirectory::new();
        let a = directory.create("a@x.com", record("aa.01")).await.unwrap();
        let b = directory.create("b@x.com", record("bb.02")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(directory.find_by_id(2).await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_find_all_lists_in_id_order() {
        let directory = InMemoryDirectory::new();
        assert!(directory.find_all().await.unwrap().is_empty());

        let a = directory.create("a@x.com", record("aa.01")).await.unwrap();
        let b = directory.create("b@x.com", record("bb.02")).await.unwrap();

        assert_eq!(directory.find_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let directory = InMemoryDirectory::new();
        directory.create("a@x.com", record("aa.01")).await.unwrap();

        let err = directory.create("a@x.com", record("bb.02")).await.unwrap_err();
        assert_eq!(err, AuthError::DuplicateIdentity);
        assert_eq!(directory.find_by_email("a@x.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_changes_fields() {
        let directory = InMemoryDirectory::new();
        let created = directory.create("a@x.com", record("aa.01")).await.unwrap();

        let updated = directory
            .update(
                created.id,
                IdentityUpdate {
                    email: Some("c@x.com".into()),
                    credential: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "c@x.com");
        assert_eq!(updated.credential, created.credential);
        assert!(directory.find_by_email("a@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email() {
        let directory = InMemoryDirectory::new();
        directory.create("a@x.com", record("aa.01")).await.unwrap();
        let b = directory.create("b@x.com", record("bb.02")).await.unwrap();

        let err = directory
            .update(
                b.id,
                IdentityUpdate {
                    email: Some("a@x.com".into()),
                    credential: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateIdentity);

        // Re-saving your own email is not a collision.
        let same = directory
            .update(
                b.id,
                IdentityUpdate {
                    email: Some("b@x.com".into()),
                    credential: None,
                },
            )
            .await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let directory = InMemoryDirectory::new();

        assert_eq!(directory.find_by_id(42).await.unwrap(), None);
        assert_eq!(
            directory.update(42, IdentityUpdate::default()).await.unwrap_err(),
            AuthError::UserNotFound(42)
        );
        assert_eq!(
            directory.remove(42).await.unwrap_err(),
            AuthError::UserNotFound(42)
        );
    }

    #[tokio::test]
    async fn test_remove_returns_identity() {
        let directory = InMemoryDirectory::new();
        let created = directory.create("a@x.com", record("aa.01")).await.unwrap();

        let removed = directory.remove(created.id).await.unwrap();
        assert_eq!(removed, created);
        assert_eq!(directory.find_by_id(created.id).await.unwrap(), None);
    }
}
