use super::auth::AuthState;
use super::orchestrator::SyncOrchestrator;
use super::remote::MemoryRemote;
use super::types::{Principal, RemoteRow, SyncPhase};
use crate::error::SyncError;
use crate::item::Item;
use crate::storage::{LocalCache, MemoryStore, HOMEWORKS_KEY};
use std::sync::Arc;

fn item(id: &str, title: &str, updated: i64) -> Item {
    Item {
        id: id.into(),
        title: title.into(),
        done: false,
        created_at: Some(updated),
        updated_at: Some(updated),
    }
}

fn row(id: &str, owner: &str, title: &str, updated: i64) -> RemoteRow {
    RemoteRow {
        id: id.into(),
        user_id: owner.into(),
        title: title.into(),
        done: true,
        created_at: Some(1),
        updated_at: Some(updated),
    }
}

async fn loaded_cache(store: Arc<MemoryStore>) -> LocalCache {
    let mut cache = LocalCache::new(store);
    cache.load().await.unwrap();
    cache
}

fn signed_in(id: &str) -> AuthState {
    AuthState::with_principal(Some(Principal::new(id)))
}

#[tokio::test]
async fn test_rejects_when_signed_out() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = SyncOrchestrator::new(remote.clone(), "homeworks");
    let store = Arc::new(MemoryStore::new());
    let cache = loaded_cache(store.clone()).await;

    let pass = orchestrator
        .run(&AuthState::new().subscribe(), &cache, &[item("a", "math", 1)])
        .await;

    assert!(matches!(pass.outcome, Err(SyncError::NotAuthenticated)));
    assert!(pass.merged.is_none());
    assert_eq!(remote.select_calls(), 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_successful_pass_updates_both_sides() {
    let remote = Arc::new(MemoryRemote::with_rows([
        row("shared", "u1", "from phone", 200),
        row("phone-only", "u1", "read", 50),
        row("not-mine", "u2", "hidden", 999),
    ]));
    let orchestrator = SyncOrchestrator::new(remote.clone(), "homeworks");
    let store = Arc::new(MemoryStore::new());
    let cache = loaded_cache(store.clone()).await;
    let local = vec![item("shared", "stale", 100), item("laptop-only", "essay", 300)];

    let pass = orchestrator.run(&signed_in("u1").subscribe(), &cache, &local).await;
    let report = pass.outcome.unwrap();
    let merged = pass.merged.unwrap();

    let ids: Vec<_> = merged.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["laptop-only", "shared", "phone-only"]);
    assert_eq!(merged[1].title, "from phone");
    assert_eq!(report.merged, 3);
    assert_eq!(report.pulled, 1);
    assert_eq!(report.pushed, 3);
    assert_eq!(report.remote_wins, 1);
    assert_eq!(report.local_wins, 0);

    let persisted: Vec<Item> =
        serde_json::from_value(store.snapshot(HOMEWORKS_KEY).await.unwrap()).unwrap();
    assert_eq!(persisted, merged);

    let rows = remote.all_rows().await;
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().any(|r| r.id == "laptop-only" && r.user_id == "u1"));
    assert!(rows.iter().any(|r| r.id == "not-mine" && r.user_id == "u2"));

    let status = orchestrator.status();
    assert_eq!(status.phase, SyncPhase::Done);
    assert!(!status.in_progress);
    assert!(status.last_sync_at.is_some());
}

#[tokio::test]
async fn test_fetch_failure_leaves_local_untouched() {
    let remote = Arc::new(MemoryRemote::new());
    remote.fail_select(true);
    let orchestrator = SyncOrchestrator::new(remote.clone(), "homeworks");
    let store = Arc::new(MemoryStore::new());
    let cache = loaded_cache(store.clone()).await;

    let pass = orchestrator
        .run(&signed_in("u1").subscribe(), &cache, &[item("a", "math", 1)])
        .await;

    assert!(matches!(pass.outcome, Err(SyncError::RemoteFetch(_))));
    assert!(pass.merged.is_none());
    assert_eq!(store.write_count(), 0);
    assert_eq!(remote.upsert_calls(), 0);
    assert_eq!(orchestrator.status().phase, SyncPhase::Idle);
    assert!(orchestrator.status().last_sync_at.is_none());
}

#[tokio::test]
async fn test_push_failure_still_commits_merged_locally() {
    let remote = Arc::new(MemoryRemote::with_rows([row("r", "u1", "remote", 10)]));
    remote.fail_upsert(true);
    let orchestrator = SyncOrchestrator::new(remote.clone(), "homeworks");
    let store = Arc::new(MemoryStore::new());
    let cache = loaded_cache(store.clone()).await;

    let pass = orchestrator
        .run(&signed_in("u1").subscribe(), &cache, &[item("l", "local", 20)])
        .await;

    assert!(matches!(pass.outcome, Err(SyncError::RemoteWrite(_))));
    let merged = pass.merged.unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(store.write_count(), 1);
    assert_eq!(remote.all_rows().await.len(), 1);
    assert_eq!(orchestrator.status().phase, SyncPhase::Idle);
}

#[tokio::test]
async fn test_store_failure_aborts_before_push() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = SyncOrchestrator::new(remote.clone(), "homeworks");
    let store = Arc::new(MemoryStore::new());
    let cache = loaded_cache(store.clone()).await;
    store.fail_writes(true);

    let pass = orchestrator
        .run(&signed_in("u1").subscribe(), &cache, &[item("a", "math", 1)])
        .await;

    assert!(matches!(pass.outcome, Err(SyncError::Store(_))));
    assert!(pass.merged.is_none());
    assert_eq!(remote.upsert_calls(), 0);
}

#[tokio::test]
async fn test_overlapping_pass_is_rejected() {
    let remote = Arc::new(MemoryRemote::new());
    let gate = remote.hold_selects();
    let orchestrator = Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks"));
    let auth = signed_in("u1");
    let store = Arc::new(MemoryStore::new());

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let sub = auth.subscribe();
        let cache = loaded_cache(store.clone()).await;
        async move { orchestrator.run(&sub, &cache, &[item("a", "math", 1)]).await }
    });
    while remote.select_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(orchestrator.status().in_progress);
    assert_eq!(orchestrator.status().phase, SyncPhase::Fetching);

    let cache = loaded_cache(store.clone()).await;
    let second = orchestrator.run(&auth.subscribe(), &cache, &[]).await;
    assert!(matches!(second.outcome, Err(SyncError::SyncInProgress(ref id)) if id == "u1"));
    assert_eq!(remote.select_calls(), 1);

    gate.notify_one();
    let first = first.await.unwrap();
    assert!(first.outcome.is_ok());

    // The guard is released once the first pass finishes.
    gate.notify_one();
    let third = orchestrator.run(&auth.subscribe(), &cache, &[]).await;
    assert!(third.outcome.is_ok());
}

#[tokio::test]
async fn test_sign_out_mid_pass_discards_results() {
    let remote = Arc::new(MemoryRemote::with_rows([row("r", "u1", "remote", 10)]));
    let gate = remote.hold_selects();
    let orchestrator = Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks"));
    let auth = signed_in("u1");
    let store = Arc::new(MemoryStore::new());

    let pass = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let sub = auth.subscribe();
        let cache = loaded_cache(store.clone()).await;
        async move { orchestrator.run(&sub, &cache, &[item("l", "local", 20)]).await }
    });
    while remote.select_calls() == 0 {
        tokio::task::yield_now().await;
    }

    auth.sign_in(Principal::new("u2"));
    gate.notify_one();
    let pass = pass.await.unwrap();

    assert!(matches!(pass.outcome, Err(SyncError::PrincipalChanged)));
    assert!(pass.merged.is_none());
    assert_eq!(store.write_count(), 0);
    assert_eq!(remote.upsert_calls(), 0);
}

#[tokio::test]
async fn test_repeated_pass_is_stable() {
    let remote = Arc::new(MemoryRemote::with_rows([row("r", "u1", "remote", 10)]));
    let orchestrator = SyncOrchestrator::new(remote.clone(), "homeworks");
    let store = Arc::new(MemoryStore::new());
    let cache = loaded_cache(store.clone()).await;
    let auth = signed_in("u1");

    let first = orchestrator
        .run(&auth.subscribe(), &cache, &[item("l", "local", 20)])
        .await;
    let merged = first.merged.unwrap();
    let second = orchestrator.run(&auth.subscribe(), &cache, &merged).await;

    assert_eq!(second.merged.unwrap(), merged);
    let report = second.outcome.unwrap();
    assert_eq!(report.local_wins, 2);
    assert_eq!(report.remote_wins, 0);
    assert_eq!(report.pulled, 0);
}

#[tokio::test]
async fn test_in_progress_tracks_every_principal() {
    let remote = Arc::new(MemoryRemote::new());
    let gate = remote.hold_selects();
    let orchestrator = Arc::new(SyncOrchestrator::new(remote.clone(), "homeworks"));
    let first_user = signed_in("u1");
    let second_user = signed_in("u2");

    let spawn_pass = |auth: &AuthState, store: Arc<MemoryStore>| {
        let orchestrator = orchestrator.clone();
        let sub = auth.subscribe();
        tokio::spawn(async move {
            let cache = loaded_cache(store).await;
            orchestrator.run(&sub, &cache, &[]).await
        })
    };

    // Waiters are released in arrival order, so u2 queues first and finishes first.
    let second = spawn_pass(&second_user, Arc::new(MemoryStore::new()));
    while remote.select_calls() < 1 {
        tokio::task::yield_now().await;
    }
    let first = spawn_pass(&first_user, Arc::new(MemoryStore::new()));
    while remote.select_calls() < 2 {
        tokio::task::yield_now().await;
    }

    gate.notify_one();
    assert!(second.await.unwrap().outcome.is_ok());
    let status = orchestrator.status();
    assert_eq!(status.phase, SyncPhase::Done);
    assert!(status.in_progress, "u1 is still fetching");

    gate.notify_one();
    assert!(first.await.unwrap().outcome.is_ok());
    assert!(!orchestrator.status().in_progress);
}
