//! `homework sync`: one reconciliation pass against the configured remote.

use chrono::Local;
use homework_core::{AuthState, Config};

use super::{local_store, open_session, saved_principal, CmdResult};

pub async fn run() -> CmdResult {
    let config = Config::load()?;
    let store = local_store()?;
    let auth = AuthState::with_principal(saved_principal(store.as_ref()).await?);
    let mut session = open_session(store, &auth, &config).await?;

    let report = session.sync().await?;
    println!(
        "Synced {} items ({} pulled, {} pushed, {} updated from remote)",
        report.merged, report.pulled, report.pushed, report.remote_wins
    );
    println!(
        "Finished at {}; remaining: {}",
        report.finished_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        session.remaining()
    );
    Ok(())
}
