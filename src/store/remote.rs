//! REST implementation of the remote progress store
//!
//! Talks to a PostgREST-style row store: one `user_progress` row per user,
//! filtered reads via query parameters, upserts via `on_conflict` +
//! `Prefer: resolution=merge-duplicates`. Requests are authorized with a
//! bearer token from the [`TokenManager`]; a 401/403 invalidates the cached
//! token and the call is retried exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RemoteProgressStore, StoreError};
use crate::auth::TokenManager;
use crate::progress::XpProgress;

const PROGRESS_TABLE: &str = "user_progress";

/// Characters that break a query-string value if left raw.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?');

/// Percent-encode a value for use inside a query string. User ids come from
/// an external auth provider, so their shape is not ours to assume.
fn encode_query_value(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_VALUE).to_string()
}

/// Pull a useful message out of an error body; PostgREST returns JSON with
/// `message`/`details` fields on failures.
fn format_http_error(code: u16, body: &str) -> StoreError {
    let body = body.trim();
    let message = if body.is_empty() {
        String::new()
    } else if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        value
            .get("message")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| body.to_string())
    } else {
        body.to_string()
    };
    StoreError::Http {
        status: code,
        message,
    }
}

fn map_ureq_error(err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            format_http_error(code, &body)
        }
        other => StoreError::Network(other.to_string()),
    }
}

/// Wire shape of the progress row. `user_id` is the conflict key; the rest
/// of the columns map one-to-one onto [`XpProgress`].
#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    user_id: String,
    #[serde(flatten)]
    progress: XpProgress,
}

#[derive(Clone)]
pub struct RestProgressStore {
    base_url: String,
    api_key: String,
    tokens: Arc<TokenManager>,
    agent: ureq::Agent,
}

impl RestProgressStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(std::time::Duration::from_secs(5))
            .timeout_read(std::time::Duration::from_secs(30))
            .build();
        Self {
            base_url,
            api_key: api_key.into(),
            tokens,
            agent,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{PROGRESS_TABLE}", self.base_url)
    }

    fn fetch_blocking(&self, user_id: &str, bearer: &str) -> Result<Option<XpProgress>, StoreError> {
        let url = format!(
            "{}?user_id=eq.{}&select=*",
            self.table_url(),
            encode_query_value(user_id)
        );
        let resp = self
            .agent
            .get(&url)
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {bearer}"))
            .call()
            .map_err(map_ureq_error)?;

        let rows: Vec<ProgressRow> = resp
            .into_json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(rows.into_iter().next().map(|r| r.progress))
    }

    fn upsert_blocking(
        &self,
        user_id: &str,
        progress: &XpProgress,
        bearer: &str,
    ) -> Result<(), StoreError> {
        let url = format!("{}?on_conflict=user_id", self.table_url());
        let row = ProgressRow {
            user_id: user_id.to_string(),
            progress: progress.clone(),
        };
        let body =
            serde_json::to_string(&row).map_err(|e| StoreError::Malformed(e.to_string()))?;

        self.agent
            .post(&url)
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {bearer}"))
            .set("Prefer", "resolution=merge-duplicates,return=minimal")
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(map_ureq_error)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteProgressStore for RestProgressStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<XpProgress>, StoreError> {
        let mut retried = false;
        loop {
            let bearer = self.tokens.bearer_token().await?;
            let this = self.clone();
            let uid = user_id.to_string();
            let result =
                tokio::task::spawn_blocking(move || this.fetch_blocking(&uid, &bearer))
                    .await
                    .map_err(|e| StoreError::Network(e.to_string()))?;

            match result {
                Err(StoreError::Http {
                    status: status @ (401 | 403),
                    ..
                }) if !retried => {
                    debug!(status, "fetch unauthorized, refreshing token and retrying");
                    self.tokens.invalidate().await;
                    retried = true;
                }
                other => return other,
            }
        }
    }

    async fn upsert(&self, user_id: &str, progress: &XpProgress) -> Result<(), StoreError> {
        let mut retried = false;
        loop {
            let bearer = self.tokens.bearer_token().await?;
            let this = self.clone();
            let uid = user_id.to_string();
            let prog = progress.clone();
            let result =
                tokio::task::spawn_blocking(move || this.upsert_blocking(&uid, &prog, &bearer))
                    .await
                    .map_err(|e| StoreError::Network(e.to_string()))?;

            match result {
                Err(StoreError::Http {
                    status: status @ (401 | 403),
                    ..
                }) if !retried => {
                    debug!(status, "upsert unauthorized, refreshing token and retrying");
                    self.tokens.invalidate().await;
                    retried = true;
                }
                other => return other,
            }
        }
    }
}
