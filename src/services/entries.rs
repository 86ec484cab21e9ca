use reqwest::Client;
use serde::Serialize;

use crate::models::entry::JournalEntry;

/// Client for the journal entry CRUD endpoints. Plain request/response
/// plumbing: no retries, no state.
pub struct EntriesApi {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EntryBody<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: String,
}

impl EntriesApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create(&self, text: &str) -> Result<JournalEntry, EntriesError> {
        tracing::debug!("Creating journal entry");
        let response = self
            .http
            .post(format!("{}/api/entries", self.base_url))
            .json(&EntryBody { text })
            .send()
            .await?;
        let entry = Self::ensure_success(response).await?.json().await?;
        Ok(entry)
    }

    pub async fn list(&self) -> Result<Vec<JournalEntry>, EntriesError> {
        let response = self
            .http
            .get(format!("{}/api/entries", self.base_url))
            .send()
            .await?;
        let entries = Self::ensure_success(response).await?.json().await?;
        Ok(entries)
    }

    pub async fn get(&self, id: u64) -> Result<JournalEntry, EntriesError> {
        let response = self
            .http
            .get(format!("{}/api/entries/{}", self.base_url, id))
            .send()
            .await?;
        let entry = Self::ensure_success(response).await?.json().await?;
        Ok(entry)
    }

    pub async fn update(&self, id: u64, text: &str) -> Result<JournalEntry, EntriesError> {
        tracing::debug!(id, "Updating journal entry");
        let response = self
            .http
            .put(format!("{}/api/entries/{}", self.base_url, id))
            .json(&EntryBody { text })
            .send()
            .await?;
        let entry = Self::ensure_success(response).await?.json().await?;
        Ok(entry)
    }

    pub async fn delete(&self, id: u64) -> Result<(), EntriesError> {
        tracing::debug!(id, "Deleting journal entry");
        let response = self
            .http
            .delete(format!("{}/api/entries/{}", self.base_url, id))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Turn a non-success response into [`EntriesError::Api`], pulling the
    /// message out of the JSON body when there is one.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EntriesError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(EntriesError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EntriesError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("journal API error ({status}): {message}")]
    Api { status: u16, message: String },
}
