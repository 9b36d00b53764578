//! Signed-in principal and its change notifications.

use tokio::sync::watch;

use crate::sync::types::Principal;

/// Owner side of the auth state. Dropping every clone closes all
/// subscriptions.
#[derive(Debug, Clone)]
pub struct AuthState {
    tx: std::sync::Arc<watch::Sender<Option<Principal>>>,
}

impl AuthState {
    /// Start signed out.
    pub fn new() -> Self {
        Self::with_principal(None)
    }

    pub fn with_principal(principal: Option<Principal>) -> Self {
        let (tx, _rx) = watch::channel(principal);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn sign_in(&self, principal: Principal) {
        tracing::info!(user_id = %principal.id, "signed in");
        self.tx.send_replace(Some(principal));
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::info!("signed out");
        }
    }

    pub fn current(&self) -> Option<Principal> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side: the current principal plus change notifications.
#[derive(Debug, Clone)]
pub struct AuthSubscription {
    rx: watch::Receiver<Option<Principal>>,
}

impl AuthSubscription {
    pub fn current(&self) -> Option<Principal> {
        self.rx.borrow().clone()
    }

    /// Whether `principal` is still the signed-in identity.
    pub fn is_current(&self, principal: &Principal) -> bool {
        self.rx
            .borrow()
            .as_ref()
            .is_some_and(|p| p.id == principal.id)
    }

    /// Current value, marking it as seen for [`AuthSubscription::next_change`].
    pub fn observe(&mut self) -> Option<Principal> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next sign-in/sign-out. `None` once the owner is gone.
    pub async fn next_change(&mut self) -> Option<Option<Principal>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
