use std::env;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::KibelaEndpoint;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRIES: usize = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 350;

const NOTE_FROM_PATH_QUERY: &str = "\
query($path: String!) {
  noteFromPath(path: $path) {
    id
  }
}";

const NOTE_CONTENT_QUERY: &str = "\
query($id: ID!) {
  note(id: $id) {
    id
    title
    content
    updatedAt
  }
}";

const UPDATE_NOTE_CONTENT_MUTATION: &str = "\
mutation($input: UpdateNoteContentInput!) {
  updateNoteContent(input: $input) {
    clientMutationId
  }
}";

/// A note as fetched from Kibela. `id` is the internal GraphQL id, not the
/// numeric id from the URL; `content` is the raw markdown body used as
/// `baseContent` when writing back.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub updated_at: Option<String>,
}

/// Extract the numeric note id from a user-facing Kibela URL.
///
/// Accepts `/notes/<id>` and `/shared/notes/<id>` paths; query parameters and
/// trailing path segments are ignored.
pub fn extract_note_id(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("invalid Kibela URL: {url}"))?;
    let rest = parsed
        .path()
        .split_once("/notes/")
        .map(|(_, rest)| rest)
        .ok_or_else(|| anyhow::anyhow!("invalid Kibela URL (expected a /notes/ path): {url}"))?;
    let note_id = rest.split('/').next().unwrap_or("");
    if note_id.is_empty() || !note_id.chars().all(|ch| ch.is_ascii_digit()) {
        bail!("could not extract a numeric note id from URL: {url}");
    }
    Ok(note_id.to_string())
}

pub struct KibelaClient {
    http: Client,
    api_url: String,
    base_url: String,
    token: String,
    user_agent: String,
    retries: usize,
    retry_delay_ms: u64,
}

impl KibelaClient {
    pub fn new(endpoint: &KibelaEndpoint) -> Result<Self> {
        let timeout_ms = env_u64("KIBELA_HTTP_TIMEOUT_MS", DEFAULT_TIMEOUT_MS);
        let retries = env_u64("KIBELA_HTTP_RETRIES", DEFAULT_RETRIES as u64) as usize;
        let retry_delay_ms = env_u64("KIBELA_HTTP_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS);
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build Kibela HTTP client")?;
        Ok(Self {
            http,
            api_url: endpoint.api_url.clone(),
            base_url: endpoint.base_url.clone(),
            token: endpoint.token.clone(),
            user_agent: endpoint.user_agent.clone(),
            retries,
            retry_delay_ms,
        })
    }

    /// Fetch a note by its URL-facing numeric id. Two round trips, as the
    /// API requires: resolve the internal id via `noteFromPath`, then load
    /// title and content.
    pub fn fetch_note(&self, note_id: &str) -> Result<Note> {
        let note_path = format!("{}/notes/{}", self.base_url, note_id);
        let data = self.graphql(
            NOTE_FROM_PATH_QUERY,
            serde_json::json!({ "path": note_path }),
        )?;
        let internal_id = data
            .get("noteFromPath")
            .and_then(|value| value.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("note not found or not accessible: {note_path}"))?
            .to_string();

        let data = self.graphql(NOTE_CONTENT_QUERY, serde_json::json!({ "id": internal_id }))?;
        let note = data
            .get("note")
            .filter(|value| !value.is_null())
            .ok_or_else(|| anyhow::anyhow!("note content not found for {internal_id}"))?;
        let content = note
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("note {internal_id} has no markdown content"))?
            .to_string();
        let title = note
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let updated_at = note
            .get("updatedAt")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        Ok(Note {
            id: internal_id,
            title,
            content,
            updated_at,
        })
    }

    /// Write back new content for a note. The fetched content travels along
    /// as `baseContent` so the server rejects conflicting concurrent edits.
    pub fn update_note_content(&self, note: &Note, new_content: &str) -> Result<()> {
        let variables = serde_json::json!({
            "input": {
                "id": note.id,
                "baseContent": note.content,
                "newContent": new_content,
                "touch": true,
            }
        });
        let data = self
            .graphql(UPDATE_NOTE_CONTENT_MUTATION, variables)
            .with_context(|| format!("failed to update note {}", note.id))?;
        if data.get("updateNoteContent").is_none_or(Value::is_null) {
            bail!("Kibela rejected the content update for note {}", note.id);
        }
        Ok(())
    }

    /// POST one GraphQL request. Transport failures and non-2xx statuses are
    /// retried with a linear backoff; GraphQL-level errors (including
    /// optimistic-concurrency rejections) abort immediately.
    fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut last_error = None::<String>;
        for attempt in 0..=self.retries {
            if attempt > 0 {
                sleep(Duration::from_millis(
                    self.retry_delay_ms.saturating_mul(attempt as u64),
                ));
            }

            let response = self
                .http
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/json")
                .header("User-Agent", self.user_agent.clone())
                .json(&body)
                .send();

            match response {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        last_error = Some(format!("HTTP {} from {}", status.as_u16(), self.api_url));
                        continue;
                    }
                    let payload: Value = response
                        .json()
                        .context("failed to decode Kibela API JSON response")?;
                    if let Some(errors) = payload.get("errors").and_then(Value::as_array)
                        && let Some(first) = errors.first()
                    {
                        let message = first
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown GraphQL error");
                        bail!("Kibela API error: {message}");
                    }
                    return payload
                        .get("data")
                        .cloned()
                        .ok_or_else(|| anyhow::anyhow!("Kibela API response missing data"));
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                }
            }
        }
        bail!(
            "{}",
            last_error.unwrap_or_else(|| "Kibela API request failed".to_string())
        )
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
