//! Remote mirror of the `homeworks` table.
//!
//! [`PostgrestRemote`] talks to a PostgREST-style REST endpoint over HTTP;
//! [`MemoryRemote`] keeps the table in process and can inject failures.

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use url::Url;

use crate::error::RemoteError;
use crate::storage::RemoteConfig;
use crate::sync::types::{Principal, RemoteRow};

/// Row-oriented remote service scoped to the authenticated principal.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All rows of `table` visible to `principal`.
    async fn select(&self, table: &str, principal: &Principal) -> Result<Vec<RemoteRow>, RemoteError>;

    /// Insert or update `rows`, matching existing rows on `conflict_key`.
    /// All-or-nothing per call.
    async fn upsert(
        &self,
        table: &str,
        rows: &[RemoteRow],
        conflict_key: &str,
        principal: &Principal,
    ) -> Result<(), RemoteError>;
}

/// HTTP adapter for a PostgREST-compatible endpoint (`/rest/v1/<table>`).
pub struct PostgrestRemote {
    client: reqwest::Client,
    base: Url,
    anon_key: String,
}

impl PostgrestRemote {
    pub fn new(url: &str, anon_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RemoteError::NotConfigured);
        }
        let mut base = Url::parse(url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            anon_key: anon_key.to_string(),
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Self::new(
            &config.url,
            &config.anon_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self, table: &str) -> Result<Url, RemoteError> {
        Ok(self.base.join(&format!("rest/v1/{table}"))?)
    }

    fn headers(&self, principal: &Principal) -> Result<HeaderMap, RemoteError> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| RemoteError::Backend(e.to_string());
        let mut headers = HeaderMap::new();
        if !self.anon_key.is_empty() {
            headers.insert("apikey", HeaderValue::from_str(&self.anon_key).map_err(invalid)?);
        }
        let bearer = principal
            .access_token
            .as_deref()
            .unwrap_or(self.anon_key.as_str());
        if !bearer.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {bearer}")).map_err(invalid)?,
            );
        }
        Ok(headers)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteStore for PostgrestRemote {
    async fn select(&self, table: &str, principal: &Principal) -> Result<Vec<RemoteRow>, RemoteError> {
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", principal.id));

        let response = self
            .client
            .get(url)
            .headers(self.headers(principal)?)
            .send()
            .await?;
        let raw: Vec<serde_json::Value> = Self::check(response).await?.json().await?;

        raw.into_iter()
            .map(|value| {
                serde_json::from_value::<RemoteRow>(value).map_err(|e| RemoteError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn upsert(
        &self,
        table: &str,
        rows: &[RemoteRow],
        conflict_key: &str,
        principal: &Principal,
    ) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("on_conflict", conflict_key);

        let response = self
            .client
            .post(url)
            .headers(self.headers(principal)?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// In-process remote table.
///
/// Row visibility mimics row-level security: `select` only returns rows whose
/// `user_id` is the caller, and `upsert` refuses to take over another owner's
/// row. Selects can be held at a gate to simulate a slow network.
#[derive(Default)]
pub struct MemoryRemote {
    rows: Mutex<IndexMap<String, RemoteRow>>,
    fail_select: AtomicBool,
    fail_upsert: AtomicBool,
    selects: AtomicUsize,
    upserts: AtomicUsize,
    select_gate: std::sync::Mutex<Option<Arc<Notify>>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = RemoteRow>) -> Self {
        let mut remote = Self::default();
        remote
            .rows
            .get_mut()
            .extend(rows.into_iter().map(|row| (row.id.clone(), row)));
        remote
    }

    pub fn fail_select(&self, fail: bool) {
        self.fail_select.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn select_calls(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Make subsequent selects wait until the returned handle is notified.
    pub fn hold_selects(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self
            .select_gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(gate.clone());
        gate
    }

    /// Every stored row regardless of owner.
    pub async fn all_rows(&self) -> Vec<RemoteRow> {
        self.rows.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select(&self, _table: &str, principal: &Principal) -> Result<Vec<RemoteRow>, RemoteError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .select_gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(RemoteError::Backend("injected select failure".into()));
        }
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|row| row.user_id == principal.id)
            .cloned()
            .collect())
    }

    async fn upsert(
        &self,
        _table: &str,
        rows: &[RemoteRow],
        conflict_key: &str,
        principal: &Principal,
    ) -> Result<(), RemoteError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(RemoteError::Backend("injected upsert failure".into()));
        }
        if conflict_key != "id" {
            return Err(RemoteError::Backend(format!(
                "no unique constraint on '{conflict_key}'"
            )));
        }

        let mut table = self.rows.lock().await;
        let foreign = rows.iter().find(|row| {
            row.user_id != principal.id
                || table
                    .get(&row.id)
                    .is_some_and(|existing| existing.user_id != principal.id)
        });
        if let Some(row) = foreign {
            return Err(RemoteError::Backend(format!(
                "row '{}' violates row-level security",
                row.id
            )));
        }
        for row in rows {
            table.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }
}
