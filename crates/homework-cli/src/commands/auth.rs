//! Sign-in state for the remote account.
//!
//! Credentials are taken as given; obtaining a token is left to the
//! account provider.

use clap::Subcommand;
use homework_core::{spawn_auto_sync, AuthState, Config, LocalStore, Principal};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{local_store, open_session, saved_principal, CmdResult, AUTH_KEY};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in and run one automatic sync
    Login {
        /// Account (user) ID written as owner of remote rows
        #[arg(long)]
        user: String,
        /// Access token for the remote service
        #[arg(long)]
        token: Option<String>,
    },
    /// Sign out (local items are kept)
    Logout,
    /// Show who is signed in
    Status,
}

pub async fn run(action: AuthAction) -> CmdResult {
    let store = local_store()?;
    match action {
        AuthAction::Login { user, token } => login(store, user, token).await?,
        AuthAction::Logout => {
            store.set(AUTH_KEY, &serde_json::Value::Null).await?;
            println!("Signed out");
        }
        AuthAction::Status => match saved_principal(store.as_ref()).await? {
            Some(principal) => println!("Signed in as {}", principal.id),
            None => println!("Not signed in"),
        },
    }
    Ok(())
}

async fn login(store: Arc<dyn LocalStore>, user: String, token: Option<String>) -> CmdResult {
    let user = user.trim().to_string();
    if user.is_empty() {
        return Err("user id must not be empty".into());
    }
    let mut principal = Principal::new(user);
    principal.access_token = token;
    store
        .set(AUTH_KEY, &serde_json::to_value(&principal)?)
        .await?;

    let config = Config::load()?;
    let auth = AuthState::new();
    if config.sync.auto_sync_on_login && config.remote_enabled() {
        let session = open_session(store, &auth, &config).await?;
        let task = spawn_auto_sync(Arc::new(Mutex::new(session)), auth.subscribe());
        auth.sign_in(principal.clone());
        drop(auth);
        match task.await {
            Ok(1) => println!("Synced after sign-in"),
            Ok(_) => println!("Automatic sync did not complete; run `homework sync` to retry"),
            Err(e) => tracing::warn!(error = %e, "automatic sync task panicked"),
        }
    } else {
        auth.sign_in(principal.clone());
    }

    println!("Signed in as {}", principal.id);
    Ok(())
}
