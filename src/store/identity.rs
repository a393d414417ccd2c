//! Identity store
//!
//! Credential accounts, sessions and password-reset delivery.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::{ErrorKind, StoreError, StoreResult};

/// Minimum credential length accepted by the identity store
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// An authenticated account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// A signed-in session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub uid: String,
}

/// Contract of the hosted identity service
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create a credential account
    async fn create_user(&self, email: &str, password: &str) -> StoreResult<AuthUser>;

    /// Exchange credentials for a session
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session>;

    /// Resolve a session token to its account
    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>>;

    /// Deliver a password-reset email
    async fn send_password_reset(&self, email: &str) -> StoreResult<()>;

    /// End a session. Unknown tokens are ignored.
    async fn sign_out(&self, token: &str) -> StoreResult<()>;
}

struct Account {
    user: AuthUser,
    /// Argon2id PHC string
    password_hash: String,
}

/// In-process identity store
///
/// Credentials are stored as Argon2id PHC strings. Password-reset "delivery"
/// appends to an outbox that tests and operators can inspect.
#[derive(Default)]
pub struct MemoryIdentityStore {
    hasher: Argon2<'static>,
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<String, String>>,
    reset_outbox: RwLock<Vec<String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store hashing with custom Argon2id cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            ..Self::default()
        }
    }

    /// Emails that received a password reset, oldest first
    pub async fn sent_resets(&self) -> Vec<String> {
        self.reset_outbox.read().await.clone()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn find_by_uid(&self, uid: &str) -> Option<AuthUser> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.user.uid == uid)
            .map(|a| a.user.clone())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose structural check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

impl MemoryIdentityStore {
    fn hash_password(&self, password: &str) -> StoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::internal(format!("password hashing failed: {}", e)))
    }

    /// Constant-time check of `password` against a stored PHC string
    fn verify_password(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is unreadable");
                false
            }
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create_user(&self, email: &str, password: &str) -> StoreResult<AuthUser> {
        if !is_valid_email(email) {
            return Err(StoreError::new(
                ErrorKind::InvalidEmail,
                format!("'{}' is not a valid email address", email),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(StoreError::new(
                ErrorKind::WeakPassword,
                format!("password must be at least {} characters", MIN_PASSWORD_LENGTH),
            ));
        }

        let key = normalize_email(email);
        let password_hash = self.hash_password(password)?;
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(StoreError::new(
                ErrorKind::EmailAlreadyInUse,
                format!("{} is already registered", key),
            ));
        }

        let user = AuthUser {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.trim().to_string(),
            created_at: Utc::now(),
            last_login_at: None,
        };
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password_hash,
            },
        );

        tracing::info!(uid = %user.uid, "Identity created");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&normalize_email(email))
            .filter(|a| self.verify_password(password, &a.password_hash))
            .ok_or_else(|| {
                StoreError::new(ErrorKind::InvalidCredentials, "wrong email or password")
            })?;

        account.user.last_login_at = Some(Utc::now());
        let session = Session {
            token: Uuid::new_v4().to_string(),
            uid: account.user.uid.clone(),
        };
        drop(accounts);

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.uid.clone());

        tracing::debug!(uid = %session.uid, "Session opened");
        Ok(session)
    }

    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>> {
        let uid = match self.sessions.read().await.get(token) {
            Some(uid) => uid.clone(),
            None => return Ok(None),
        };
        Ok(self.find_by_uid(&uid).await)
    }

    async fn send_password_reset(&self, email: &str) -> StoreResult<()> {
        if !self
            .accounts
            .read()
            .await
            .contains_key(&normalize_email(email))
        {
            return Err(StoreError::not_found(format!("no account for {}", email)));
        }

        self.reset_outbox.write().await.push(email.trim().to_string());
        tracing::info!(email = %email, "Password reset queued");
        Ok(())
    }

    async fn sign_out(&self, token: &str) -> StoreResult<()> {
        if let Some(uid) = self.sessions.write().await.remove(token) {
            tracing::debug!(uid = %uid, "Session closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("jane@x.com"));
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("ja ne@x.com"));
    }

    #[tokio::test]
    async fn test_create_and_sign_in() {
        let store = MemoryIdentityStore::new();
        let user = store.create_user("jane@x.com", "secret1").await.unwrap();

        let session = store.sign_in("JANE@x.com", "secret1").await.unwrap();
        assert_eq!(session.uid, user.uid);

        let current = store.current_user(&session.token).await.unwrap().unwrap();
        assert_eq!(current.email, "jane@x.com");
        assert!(current.last_login_at.is_some());

        store.sign_out(&session.token).await.unwrap();
        assert!(store.current_user(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryIdentityStore::new();
        store.create_user("jane@x.com", "secret1").await.unwrap();
        let err = store.create_user("jane@x.com", "secret2").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmailAlreadyInUse);
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let store = MemoryIdentityStore::new();
        let err = store.create_user("not-an-email", "secret1").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEmail);

        let err = store.create_user("jane@x.com", "short").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::WeakPassword);
    }

    #[tokio::test]
    async fn test_passwords_stored_as_argon2id() {
        let store = MemoryIdentityStore::new();
        store.create_user("jane@x.com", "secret1").await.unwrap();
        store.create_user("joe@x.com", "secret1").await.unwrap();

        let accounts = store.accounts.read().await;
        let jane = &accounts["jane@x.com"].password_hash;
        let joe = &accounts["joe@x.com"].password_hash;
        assert!(jane.starts_with("$argon2id$"));
        assert!(!jane.contains("secret1"));
        // Per-account salts
        assert_ne!(jane, joe);
        assert!(store.verify_password("secret1", jane));
        assert!(!store.verify_password("secret2", jane));
        assert!(!store.verify_password("secret1", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let store = MemoryIdentityStore::new();
        store.create_user("jane@x.com", "secret1").await.unwrap();
        let err = store.sign_in("jane@x.com", "wrong!!").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_password_reset_outbox() {
        let store = MemoryIdentityStore::new();
        store.create_user("jane@x.com", "secret1").await.unwrap();
        store.send_password_reset("jane@x.com").await.unwrap();
        assert_eq!(store.sent_resets().await, vec!["jane@x.com"]);

        let err = store.send_password_reset("nobody@x.com").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
