use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tracing::error;

use crate::models::{NewEntry, TagRow, WaitlistEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    // unique constraint on email fired
    #[error("duplicate email")]
    Duplicate,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Contract with the persistence collaborator. The service never reads
/// before writing: uniqueness is the store's job, and a conflicting insert
/// must surface as `StoreError::Duplicate` so concurrent submissions of the
/// same email race safely.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
    /// source/school columns for every row, capped for sanity
    async fn tag_rows(&self, cap: usize) -> Result<Vec<TagRow>, StoreError>;
    /// newest rows first, ordered by descending id
    async fn recent(&self, limit: usize) -> Result<Vec<WaitlistEntry>, StoreError>;
}

/// REST client for a PostgREST-style store (Supabase in production).
/// Constructed once at startup and injected; credentials are never read
/// from the environment at request time.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/waitlist", self.base_url)
    }

    fn get(&self, query: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}?{}", self.table_url(), query))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

// Postgres unique_violation, as PostgREST reports it in the error body
const UNIQUE_VIOLATION: &str = "23505";

#[async_trait]
impl WaitlistStore for RestStore {
    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&[entry])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT
            || body.contains(UNIQUE_VIOLATION)
            || body.contains("duplicate key")
        {
            return Err(StoreError::Duplicate);
        }

        error!(%status, body, "waitlist insert failed");
        Err(StoreError::Unavailable(format!("insert returned {status}")))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        // HEAD-style exact count: the total comes back in Content-Range
        let response = self
            .get("select=id&limit=1")
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!("count returned {status}")));
        }

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| StoreError::Unavailable("missing content-range".to_string()))?;

        Ok(total)
    }

    async fn tag_rows(&self, cap: usize) -> Result<Vec<TagRow>, StoreError> {
        let response = self
            .get(&format!("select=source,school&limit={cap}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!("select returned {status}")));
        }

        Ok(response.json().await?)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<WaitlistEntry>, StoreError> {
        let response = self
            .get(&format!(
                "select=id,name,email,school,source,created_at&order=id.desc&limit={limit}"
            ))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!("select returned {status}")));
        }

        Ok(response.json().await?)
    }
}

/// In-memory store used when no store URL is configured, and by the tests.
/// A single mutex makes insert's duplicate check plus append atomic, which
/// is what gives the at-most-one guarantee for racing submissions.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<WaitlistEntry>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl WaitlistStore for MemoryStore {
    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if rows.iter().any(|row| row.email == entry.email) {
            return Err(StoreError::Duplicate);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        rows.push(WaitlistEntry {
            id,
            name: entry.name.clone(),
            email: entry.email.clone(),
            school: entry.school.clone(),
            source: entry.source.clone(),
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.len() as u64)
    }

    async fn tag_rows(&self, cap: usize) -> Result<Vec<TagRow>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .iter()
            .take(cap)
            .map(|row| TagRow {
                source: row.source.clone(),
                school: row.school.clone(),
            })
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<WaitlistEntry>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
}
