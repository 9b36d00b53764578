//! Command implementations and the shared session wiring.

pub mod auth;
pub mod config;
pub mod items;
pub mod sync;

use homework_core::storage::data_dir;
use homework_core::{
    AuthState, Config, HomeworkSession, JsonFileStore, LocalStore, PostgrestRemote, Principal,
    SyncOrchestrator,
};
use std::sync::Arc;

/// Local store key holding the signed-in principal.
pub const AUTH_KEY: &str = "auth";

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn local_store() -> Result<Arc<dyn LocalStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(JsonFileStore::new(data_dir()?)))
}

/// Principal persisted by `auth login`, if any.
pub async fn saved_principal(
    store: &dyn LocalStore,
) -> Result<Option<Principal>, Box<dyn std::error::Error>> {
    match store.get(AUTH_KEY).await? {
        Some(value) if !value.is_null() => Ok(Some(serde_json::from_value(value)?)),
        _ => Ok(None),
    }
}

/// Open the session, wired for sync when a remote URL is configured.
pub async fn open_session(
    store: Arc<dyn LocalStore>,
    auth: &AuthState,
    config: &Config,
) -> Result<HomeworkSession, Box<dyn std::error::Error>> {
    let session = HomeworkSession::open(store, auth.subscribe()).await?;
    if !config.remote_enabled() {
        return Ok(session);
    }
    let remote = PostgrestRemote::from_config(&config.remote)?;
    let orchestrator = SyncOrchestrator::new(Arc::new(remote), config.remote.table.clone());
    Ok(session.with_sync(Arc::new(orchestrator)))
}
