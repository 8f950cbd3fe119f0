//! Owner/viewer session gate.
//!
//! A single shared passphrase flips a persisted boolean. This is an access
//! switch for a single-user tool, not authentication.

use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::db::MetadataStore;
use crate::errors::{AppError, AppResult};

/// Message shown next to the login form after a wrong passphrase.
pub const INCORRECT_PASSPHRASE: &str = "Incorrect password.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Owner,
    Viewer,
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Granted,
    Denied { message: String },
}

/// Current session mode plus its persisted flag.
pub struct SessionGate {
    state: RwLock<SessionState>,
    passphrase: String,
    store: Arc<dyn MetadataStore>,
}

impl SessionGate {
    /// Restore the mode from the persisted flag. An unreadable flag means viewer.
    pub async fn restore(store: Arc<dyn MetadataStore>, passphrase: impl Into<String>) -> Self {
        let state = match store.session_flag().await {
            Ok(true) => SessionState::Owner,
            Ok(false) => SessionState::Viewer,
            Err(e) => {
                tracing::warn!("Could not read session flag, starting as viewer: {}", e);
                SessionState::Viewer
            }
        };

        Self {
            state: RwLock::new(state),
            passphrase: passphrase.into(),
            store,
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_owner(&self) -> bool {
        self.state().await == SessionState::Owner
    }

    /// Refuse unless the session is in owner mode.
    pub async fn require_owner(&self) -> AppResult<()> {
        if self.is_owner().await {
            Ok(())
        } else {
            tracing::debug!("Mutation refused in viewer mode");
            Err(AppError::Unauthorized("Owner mode required".to_string()))
        }
    }

    /// Switch to owner mode if `passphrase` matches. Repeated failures are not
    /// throttled.
    pub async fn login(&self, passphrase: &str) -> LoginOutcome {
        if !constant_time_compare(passphrase, &self.passphrase) {
            tracing::info!("Login failed: wrong passphrase");
            return LoginOutcome::Denied {
                message: INCORRECT_PASSPHRASE.to_string(),
            };
        }

        *self.state.write().await = SessionState::Owner;
        if let Err(e) = self.store.set_session_flag(true).await {
            tracing::error!("Could not persist owner flag: {}", e);
        }

        tracing::info!("Login successful");
        LoginOutcome::Granted
    }

    /// Return to viewer mode and clear the persisted flag.
    pub async fn logout(&self) {
        *self.state.write().await = SessionState::Viewer;
        if let Err(e) = self.store.set_session_flag(false).await {
            tracing::error!("Could not clear owner flag: {}", e);
        }
        tracing::info!("Logged out");
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryMetadataStore, IS_OWNER_KEY};

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("admin", "admin"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("admin", "Admin"));
        assert!(!constant_time_compare("", "admin"));
        assert!(!constant_time_compare("admin ", "admin"));
    }

    #[tokio::test]
    async fn test_cold_start_defaults_to_viewer() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = SessionGate::restore(store, "admin").await;

        assert_eq!(gate.state().await, SessionState::Viewer);
        assert!(matches!(
            gate.require_owner().await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_cold_start_restores_owner_flag() {
        let store = Arc::new(MemoryMetadataStore::new());
        store.set_item(IS_OWNER_KEY, "true").await.unwrap();

        let gate = SessionGate::restore(store, "admin").await;
        assert_eq!(gate.state().await, SessionState::Owner);
    }

    #[tokio::test]
    async fn test_login_with_correct_passphrase_persists_flag() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = SessionGate::restore(store.clone(), "admin").await;

        assert_eq!(gate.login("admin").await, LoginOutcome::Granted);
        assert!(gate.is_owner().await);
        assert_eq!(
            store.get_item(IS_OWNER_KEY).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_login_with_wrong_passphrase_stays_viewer() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = SessionGate::restore(store.clone(), "admin").await;

        for attempt in ["", "ADMIN", "letmein"] {
            match gate.login(attempt).await {
                LoginOutcome::Denied { message } => assert!(!message.is_empty()),
                LoginOutcome::Granted => panic!("login should fail for {:?}", attempt),
            }
        }
        assert_eq!(gate.state().await, SessionState::Viewer);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_flag() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = SessionGate::restore(store.clone(), "admin").await;
        gate.login("admin").await;

        gate.logout().await;
        assert_eq!(gate.state().await, SessionState::Viewer);
        assert_eq!(store.get_item(IS_OWNER_KEY).await.unwrap(), None);

        // Logging out as a viewer is harmless.
        gate.logout().await;
        assert_eq!(gate.state().await, SessionState::Viewer);
    }
}
