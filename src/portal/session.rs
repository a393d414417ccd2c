//! Session Guard
//!
//! Admits only signed-in identities that carry an admin marker record.
//! Anything else is redirected to the login page; a signed-in identity
//! without the marker is signed out first.

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{Action, PortalError, PortalResult};
use crate::store::{Backend, Collection, ErrorKind, Session};

/// The privileged identity a request runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminContext {
    pub uid: String,
    pub email: String,
    #[serde(skip)]
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed(AdminContext),
    Redirect { location: String, signed_out: bool },
}

pub struct SessionGuard {
    backend: Backend,
    login_path: String,
}

impl SessionGuard {
    pub fn new(backend: Backend, login_path: impl Into<String>) -> Self {
        Self {
            backend,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    fn redirect(&self, signed_out: bool) -> GuardOutcome {
        GuardOutcome::Redirect {
            location: self.login_path.clone(),
            signed_out,
        }
    }

    /// Decide whether the holder of `token` may use the dashboard
    pub async fn check(&self, token: Option<&str>) -> GuardOutcome {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return self.redirect(false);
        };

        let user = match self.backend.identity.current_user(token).await {
            Ok(Some(user)) => user,
            Ok(None) => return self.redirect(false),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed");
                return self.redirect(false);
            }
        };

        if self.is_privileged(&user.uid).await {
            return GuardOutcome::Proceed(AdminContext {
                uid: user.uid,
                email: user.email,
                session_token: token.to_string(),
            });
        }

        tracing::warn!(uid = %user.uid, email = %user.email, "Non-admin session rejected");
        if let Err(e) = self.backend.identity.sign_out(token).await {
            tracing::warn!(uid = %user.uid, error = %e, "Sign-out of rejected session failed");
        }
        self.redirect(true)
    }

    /// Presence of the admin marker; lookup errors count as unprivileged
    pub async fn is_privileged(&self, uid: &str) -> bool {
        match self.backend.records.get(Collection::Admins, uid).await {
            Ok(marker) => marker.is_some(),
            Err(e) => {
                tracing::error!(uid = %uid, error = %e, "Privilege check failed");
                false
            }
        }
    }

    /// Sign in with credentials and require the admin marker
    pub async fn sign_in(&self, email: &str, password: &str) -> PortalResult<AdminContext> {
        let Session { token, uid } = self
            .backend
            .identity
            .sign_in(email, password)
            .await
            .map_err(|e| PortalError::backend(Action::SignIn, e))?;

        if !self.is_privileged(&uid).await {
            if let Err(e) = self.backend.identity.sign_out(&token).await {
                tracing::warn!(uid = %uid, error = %e, "Sign-out of rejected session failed");
            }
            return Err(PortalError::NotPrivileged);
        }

        tracing::info!(uid = %uid, "Administrator signed in");
        Ok(AdminContext {
            uid,
            email: email.trim().to_string(),
            session_token: token,
        })
    }

    pub async fn sign_out(&self, token: &str) -> PortalResult<()> {
        self.backend
            .identity
            .sign_out(token)
            .await
            .map_err(|e| PortalError::backend(Action::SignOut, e))
    }

    /// Ensure `email` exists and carries the admin marker; returns its uid.
    /// An existing account must sign in with `password`.
    pub async fn grant_admin(&self, email: &str, password: &str) -> PortalResult<String> {
        let identity = &self.backend.identity;
        let uid = match identity.create_user(email, password).await {
            Ok(user) => user.uid,
            Err(e) if e.kind == ErrorKind::EmailAlreadyInUse => {
                let session = identity
                    .sign_in(email, password)
                    .await
                    .map_err(|e| PortalError::backend(Action::SignIn, e))?;
                if let Err(e) = identity.sign_out(&session.token).await {
                    tracing::warn!(error = %e, "Sign-out after admin lookup failed");
                }
                session.uid
            }
            Err(e) => return Err(PortalError::backend(Action::SignIn, e)),
        };

        let mut marker = Map::new();
        marker.insert("email".to_string(), Value::String(email.trim().to_string()));
        self.backend
            .records
            .set(Collection::Admins, &uid, marker)
            .await
            .map_err(|e| PortalError::backend(Action::SignIn, e))?;

        tracing::info!(uid = %uid, "Administrator granted");
        Ok(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::faults::{Harness, RecordOp};
    use crate::store::IdentityStore;
    use tempfile::tempdir;

    fn redirected(outcome: &GuardOutcome) -> bool {
        matches!(outcome, GuardOutcome::Redirect { location, .. } if location == "/admin/login")
    }

    #[tokio::test]
    async fn test_no_session_redirects() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path());
        let guard = SessionGuard::new(harness.backend.clone(), "/admin/login");

        assert!(redirected(&guard.check(None).await));
        assert!(redirected(&guard.check(Some("")).await));
        assert!(redirected(&guard.check(Some("stale-token")).await));
    }

    #[tokio::test]
    async fn test_admin_proceeds() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path());
        let session = harness.admin("ops@blackpine.com", "secret123").await;
        let guard = SessionGuard::new(harness.backend.clone(), "/admin/login");

        match guard.check(Some(&session.token)).await {
            GuardOutcome::Proceed(ctx) => {
                assert_eq!(ctx.uid, session.uid);
                assert_eq!(ctx.email, "ops@blackpine.com");
            }
            other => panic!("expected proceed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_admin_is_signed_out() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path());
        harness.identity.inner.create_user("jane@x.com", "secret123").await.unwrap();
        let session = harness.identity.inner.sign_in("jane@x.com", "secret123").await.unwrap();
        let guard = SessionGuard::new(harness.backend.clone(), "/admin/login");

        let outcome = guard.check(Some(&session.token)).await;
        assert!(matches!(outcome, GuardOutcome::Redirect { signed_out: true, .. }));
        assert!(harness.identity.inner.current_user(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_privilege_lookup_failure_fails_closed() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path());
        let session = harness.admin("ops@blackpine.com", "secret123").await;
        harness
            .records
            .fail(RecordOp::Get, Collection::Admins, ErrorKind::Unavailable);
        let guard = SessionGuard::new(harness.backend.clone(), "/admin/login");

        assert!(redirected(&guard.check(Some(&session.token)).await));
    }

    #[tokio::test]
    async fn test_sign_in_requires_marker() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path());
        harness.admin("ops@blackpine.com", "secret123").await;
        harness.identity.inner.create_user("jane@x.com", "secret123").await.unwrap();
        let guard = SessionGuard::new(harness.backend.clone(), "/admin/login");

        assert!(guard.sign_in("ops@blackpine.com", "secret123").await.is_ok());
        assert!(matches!(
            guard.sign_in("jane@x.com", "secret123").await,
            Err(PortalError::NotPrivileged)
        ));
        let err = guard.sign_in("ops@blackpine.com", "wrong-pass").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_grant_admin_is_idempotent() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path());
        let guard = SessionGuard::new(harness.backend.clone(), "/admin/login");

        let uid = guard.grant_admin("ops@blackpine.com", "secret123").await.unwrap();
        let again = guard.grant_admin("ops@blackpine.com", "secret123").await.unwrap();
        assert_eq!(uid, again);
        assert!(guard.is_privileged(&uid).await);

        let err = guard.grant_admin("ops@blackpine.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, PortalError::Backend { action: Action::SignIn, .. }));
    }
}
