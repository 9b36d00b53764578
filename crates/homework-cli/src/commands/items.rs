//! Local item commands: add, list, toggle, remove.

use homework_core::{AuthState, HomeworkSession, Item};

use super::{local_store, CmdResult};

async fn open_local() -> Result<HomeworkSession, Box<dyn std::error::Error>> {
    let store = local_store()?;
    Ok(HomeworkSession::open(store, AuthState::new().subscribe()).await?)
}

/// Resolve a full id or a unique id prefix.
fn resolve_id(items: &[Item], given: &str) -> Result<String, Box<dyn std::error::Error>> {
    if items.iter().any(|h| h.id == given) {
        return Ok(given.to_string());
    }
    let matches: Vec<&Item> = items.iter().filter(|h| h.id.starts_with(given)).collect();
    match matches.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => Err(format!("no item matches '{given}'").into()),
        _ => Err(format!("'{given}' matches {} items; use a longer prefix", matches.len()).into()),
    }
}

pub async fn add(title: &str) -> CmdResult {
    let mut session = open_local().await?;
    let item = session.add(title).await?;
    println!("Added: {}", item.id);
    Ok(())
}

pub async fn list(json: bool) -> CmdResult {
    let session = open_local().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(session.items())?);
        return Ok(());
    }

    if session.items().is_empty() {
        println!("No homework yet.");
        return Ok(());
    }
    for item in session.items() {
        let mark = if item.done { "x" } else { " " };
        let short_id: String = item.id.chars().take(8).collect();
        println!("[{mark}] {short_id}  {}", item.title);
    }
    println!("Remaining: {}", session.remaining());
    Ok(())
}

pub async fn toggle(id: &str) -> CmdResult {
    let mut session = open_local().await?;
    let id = resolve_id(session.items(), id)?;
    session.toggle(&id).await?;
    if let Some(item) = session.items().iter().find(|h| h.id == id) {
        let state = if item.done { "done" } else { "not done" };
        println!("{}: {state}", item.title);
    }
    Ok(())
}

pub async fn remove(id: &str) -> CmdResult {
    let mut session = open_local().await?;
    let id = resolve_id(session.items(), id)?;
    session.remove(&id).await?;
    println!("Removed: {id}");
    Ok(())
}
