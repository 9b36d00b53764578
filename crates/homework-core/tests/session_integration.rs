//! Session-level tests: local mutations, persistence and sync wiring.

use homework_core::storage::HOMEWORKS_KEY;
use homework_core::{
    spawn_auto_sync, AuthState, CoreError, HomeworkSession, JsonFileStore, LocalStore,
    MemoryRemote, MemoryStore, Principal, RemoteRow, SyncError, SyncOrchestrator,
    ValidationError,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

fn remote_row(id: &str, owner: &str, title: &str, updated: i64) -> RemoteRow {
    RemoteRow {
        id: id.into(),
        user_id: owner.into(),
        title: title.into(),
        done: false,
        created_at: Some(updated),
        updated_at: Some(updated),
    }
}

#[tokio::test]
async fn mutations_persist_across_sessions() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn LocalStore> = Arc::new(JsonFileStore::new(dir.path()));
    let auth = AuthState::new();

    let mut session = HomeworkSession::open(store.clone(), auth.subscribe()).await.unwrap();
    let math = session.add("  math 10 problems ").await.unwrap();
    let essay = session.add("essay").await.unwrap();
    session.toggle(&math.id).await.unwrap();
    assert_eq!(session.remaining(), 1);
    drop(session);

    let mut reopened = HomeworkSession::open(store.clone(), auth.subscribe()).await.unwrap();
    let titles: Vec<_> = reopened.items().iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["essay", "math 10 problems"]);
    assert!(reopened.items()[1].done);

    reopened.remove(&essay.id).await.unwrap();
    let raw = store.get(HOMEWORKS_KEY).await.unwrap().unwrap();
    assert_eq!(raw.as_array().unwrap().len(), 1);
    assert_eq!(raw[0]["title"], "math 10 problems");
    assert!(raw[0]["updatedAt"].as_i64().unwrap() >= raw[0]["createdAt"].as_i64().unwrap());
}

#[tokio::test]
async fn invalid_mutations_do_not_write() {
    let store = Arc::new(MemoryStore::new());
    let mut session = HomeworkSession::open(store.clone(), AuthState::new().subscribe())
        .await
        .unwrap();

    assert!(matches!(
        session.add("   ").await,
        Err(CoreError::Validation(ValidationError::EmptyTitle))
    ));
    assert!(matches!(
        session.toggle("missing").await,
        Err(CoreError::Validation(ValidationError::UnknownItem(_)))
    ));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn store_failure_is_surfaced_but_memory_is_committed() {
    let store = Arc::new(MemoryStore::new());
    let mut session = HomeworkSession::open(store.clone(), AuthState::new().subscribe())
        .await
        .unwrap();
    store.fail_writes(true);

    assert!(matches!(session.add("math").await, Err(CoreError::Store(_))));
    assert_eq!(session.items().len(), 1);
}

#[tokio::test]
async fn legacy_collection_loads_and_syncs() {
    let store = Arc::new(MemoryStore::with_value(
        HOMEWORKS_KEY,
        json!([
            {"id": "old-1", "title": "science", "done": false, "createdAt": 1000},
            {"id": 1700000000000_i64, "title": "history", "done": true}
        ]),
    ));
    let remote = Arc::new(MemoryRemote::new());
    let auth = AuthState::with_principal(Some(Principal::new("u1")));
    let orchestrator = Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks"));

    let mut session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(orchestrator);
    let report = session.sync().await.unwrap();

    assert_eq!(report.pushed, 2);
    let rows = remote.all_rows().await;
    assert!(rows.iter().all(|r| r.created_at.is_some() && r.updated_at.is_some()));
    let science = rows.iter().find(|r| r.id == "old-1").unwrap();
    assert_eq!(science.created_at, Some(1000));
    assert_eq!(science.updated_at, Some(1000));
    assert!(rows.iter().any(|r| r.id == "1700000000000"));
}

#[tokio::test]
async fn sync_without_remote_or_principal_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let auth = AuthState::new();
    let mut offline = HomeworkSession::open(store.clone(), auth.subscribe()).await.unwrap();
    assert!(matches!(offline.sync().await, Err(SyncError::Disabled)));

    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks"));
    let mut signed_out = HomeworkSession::open(store, auth.subscribe())
        .await
        .unwrap()
        .with_sync(orchestrator);
    assert!(matches!(signed_out.sync().await, Err(SyncError::NotAuthenticated)));
    assert_eq!(remote.select_calls(), 0);
}

#[tokio::test]
async fn failed_fetch_keeps_session_items() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::new());
    remote.fail_select(true);
    let auth = AuthState::with_principal(Some(Principal::new("u1")));
    let mut session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks")));
    session.add("math").await.unwrap();
    let before = session.items().to_vec();

    assert!(matches!(session.sync().await, Err(SyncError::RemoteFetch(_))));
    assert_eq!(session.items(), before.as_slice());
    assert_eq!(store.write_count(), 1);
    assert_eq!(remote.upsert_calls(), 0);
}

#[tokio::test]
async fn failed_push_still_adopts_merged_items() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::with_rows([remote_row("r", "u1", "from tablet", 5)]));
    remote.fail_upsert(true);
    let auth = AuthState::with_principal(Some(Principal::new("u1")));
    let mut session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks")));

    assert!(matches!(session.sync().await, Err(SyncError::RemoteWrite(_))));
    assert_eq!(session.items().len(), 1);
    assert_eq!(session.items()[0].title, "from tablet");
}

#[tokio::test]
async fn sign_in_triggers_one_automatic_pass() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::with_rows([remote_row("r", "u1", "from phone", 5)]));
    let auth = AuthState::new();
    let session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks")));
    let session = Arc::new(Mutex::new(session));

    let task = spawn_auto_sync(session.clone(), auth.subscribe());
    auth.sign_in(Principal::new("u1"));
    drop(auth);

    assert_eq!(task.await.unwrap(), 1);
    assert_eq!(remote.select_calls(), 1);
    let session = session.lock().await;
    assert_eq!(session.items().len(), 1);
    assert_eq!(session.items()[0].title, "from phone");
}

#[tokio::test]
async fn automatic_pass_failure_is_swallowed() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::new());
    remote.fail_select(true);
    let auth = AuthState::new();
    let session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks")));

    let task = spawn_auto_sync(Arc::new(Mutex::new(session)), auth.subscribe());
    auth.sign_in(Principal::new("u1"));
    drop(auth);

    assert_eq!(task.await.unwrap(), 0);
    assert_eq!(remote.select_calls(), 1);
}

#[tokio::test]
async fn already_signed_in_does_not_resync() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::new());
    let auth = AuthState::with_principal(Some(Principal::new("u1")));
    let session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks")));

    let task = spawn_auto_sync(Arc::new(Mutex::new(session)), auth.subscribe());
    auth.sign_in(Principal::new("u1").with_token("refreshed"));
    drop(auth);

    assert_eq!(task.await.unwrap(), 0);
    assert_eq!(remote.select_calls(), 0);
}

#[tokio::test]
async fn account_switch_during_a_pass_syncs_the_new_account() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::with_rows([remote_row("t", "u2", "from tablet", 5)]));
    let gate = remote.hold_selects();
    let auth = AuthState::new();
    let session = HomeworkSession::open(store.clone(), auth.subscribe())
        .await
        .unwrap()
        .with_sync(Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks")));
    let session = Arc::new(Mutex::new(session));

    let task = spawn_auto_sync(session.clone(), auth.subscribe());
    auth.sign_in(Principal::new("u1"));
    while remote.select_calls() < 1 {
        tokio::task::yield_now().await;
    }

    auth.sign_out();
    auth.sign_in(Principal::new("u2"));
    gate.notify_one();
    while remote.select_calls() < 2 {
        tokio::task::yield_now().await;
    }
    gate.notify_one();
    drop(auth);

    assert_eq!(task.await.unwrap(), 1);
    assert_eq!(remote.select_calls(), 2);
    let session = session.lock().await;
    assert_eq!(session.items().len(), 1);
    assert_eq!(session.items()[0].title, "from tablet");
}
