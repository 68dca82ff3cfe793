//! 📡 ElasticsearchSink — NDJSON into `/_bulk`, no buffering, no drama.
//!
//! 🎬 COLD OPEN — INT. ELASTICSEARCH CLUSTER — BULK ENDPOINT — HIGH NOON
//!
//! The bulk API has rules. Two lines per document: action metadata, then
//! source. Newline-delimited. The trailing newline on the whole body
//! matters. It MATTERS. Three engineers lost weekends to this. One of them
//! still flinches at `\n`.
//!
//! Every document in a batch is an upsert keyed by its film id — the
//! `index` action is a full overwrite, so replaying a batch lands the
//! cluster in exactly the same state. And because retries replay whole
//! passes, a partially failed bulk response (`"errors": true`) fails the
//! ENTIRE call. We do not pick through the rubble for survivors.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, trace};

use super::DocumentSink;
use crate::app_config::SinkConfig;
use crate::common::FilmDocument;
use crate::error::SyncError;

/// 📡 The sink side of the pipeline — pure I/O against a cluster.
///
/// Internally holds:
/// - `client`: the HTTP muscle 💪 — reused across requests
/// - `config`: url, target index, and the auth adventure of your choice
#[derive(Debug)]
pub(crate) struct ElasticsearchSink {
    client: reqwest::Client,
    config: SinkConfig,
}

impl ElasticsearchSink {
    /// 🚀 Stand up a sink, fully wired and ready to receive documents.
    ///
    /// Three things happen here:
    /// 1. Build the `reqwest::Client` with sane timeouts (10s connect, 30s
    ///    request). Like a polite person — we will wait, but not forever.
    /// 2. Ping the cluster root to confirm it's alive and talking to us.
    ///    Fail loudly here rather than quietly 50,000 documents later.
    /// 3. Verify the target index exists. Indexing into a nonexistent index
    ///    is a skill issue we catch at init time, not ten batches deep.
    pub(crate) async fn new(config: SinkConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        // 📡 Connectivity ping — "Hello? Is this thing on?" An unhappy
        // status here usually means mid-restart, so it's a transient fault
        // and the outer loop backs off instead of giving up.
        let ping = apply_auth(client.get(base_url(&config)), &config).send().await?;
        if !ping.status().is_success() {
            return Err(SyncError::SinkUnavailable(format!(
                "💀 cluster ping answered {} — it's home, but it's not happy",
                ping.status()
            )));
        }

        // 🔒 Index existence check. trim_end_matches('/') is the slash
        // hygiene you didn't know you needed: one slash of difference,
        // infinite suffering of difference. A 404 is a config problem; any
        // other bad status is the cluster having a moment.
        let index_url = format!("{}/{}", base_url(&config), config.index);
        let check = apply_auth(client.get(&index_url), &config).send().await?;
        let status = check.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::SinkRejected(format!(
                "💀 index '{}' does not exist as far as the cluster will admit ({status}). \
                 Create it, or check your spelling — easy mistake, no judgment, but also: please fix it.",
                config.index,
            )));
        }
        if !status.is_success() {
            return Err(SyncError::SinkUnavailable(format!(
                "💀 index check for '{}' answered {status}",
                config.index
            )));
        }

        debug!(index = %config.index, "📡 sink connected, index exists, welcome mat is out");
        Ok(Self { client, config })
    }

    async fn submit_bulk(&self, body: String) -> Result<(), SyncError> {
        let bulk_url = format!("{}/_bulk", base_url(&self.config));
        let request = apply_auth(self.client.post(&bulk_url), &self.config)
            // ⚠️ application/x-ndjson, not application/json. Elasticsearch
            // will 406 or silently misbehave without it. The x- prefix means
            // "we made this up but we're committing to it." Classic.
            .header("Content-Type", "application/x-ndjson")
            .body(body);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::SinkRejected(format!(
                "💀 bulk request answered {status}: {body}"
            )));
        }

        // 2xx does not mean victory. The bulk API happily returns 200 with
        // per-item failures tucked inside. "errors": true sinks the batch.
        let body: Value = response.json().await?;
        if body["errors"].as_bool().unwrap_or(false) {
            let reasons = collect_item_failures(&body);
            return Err(SyncError::SinkRejected(format!(
                "💀 bulk write partially failed ({} item(s)): {}",
                reasons.len(),
                reasons.join("; ")
            )));
        }

        trace!("🚀 bulk request landed — documents have left the building, Elvis-style");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentSink for ElasticsearchSink {
    async fn bulk_upsert(&mut self, docs: &[FilmDocument]) -> Result<(), SyncError> {
        if docs.is_empty() {
            trace!("🗑️ empty batch, nothing leaves the building");
            return Ok(());
        }
        let body = render_bulk_body(docs, &self.config.index)?;
        debug!(docs = docs.len(), bytes = body.len(), "📡 sending bulk upsert");
        self.submit_bulk(body).await
    }
}

fn base_url(config: &SinkConfig) -> &str {
    config.url.trim_end_matches('/')
}

/// 🔒 Auth priority: API key beats basic auth. This is not a democracy.
fn apply_auth(request: reqwest::RequestBuilder, config: &SinkConfig) -> reqwest::RequestBuilder {
    if let Some(ref api_key) = config.api_key {
        request.header("Authorization", format!("ApiKey {api_key}"))
    } else if let Some(ref username) = config.username {
        request.basic_auth(username, config.password.as_ref())
    } else {
        request
    }
}

/// 🏗️ Render one batch as bulk NDJSON: the sacred two-line format, repeated,
/// with the equally sacred trailing newline.
fn render_bulk_body(docs: &[FilmDocument], index: &str) -> Result<String, SyncError> {
    let mut body = String::new();
    for doc in docs {
        let action = json!({ "index": { "_index": index, "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

/// 🔍 Pull human-readable reasons out of a bulk response's `items` array.
fn collect_item_failures(body: &Value) -> Vec<String> {
    let mut reasons = Vec::new();
    if let Some(items) = body["items"].as_array() {
        for item in items {
            // Each item is {"index": {...}} (or whatever op we sent).
            let op = item.as_object().and_then(|o| o.values().next());
            if let Some(op) = op {
                if let Some(error) = op.get("error") {
                    let id = op["_id"].as_str().unwrap_or("unknown");
                    let reason = error["reason"].as_str().unwrap_or("unknown");
                    reasons.push(format!("{id}: {reason}"));
                }
            }
        }
    }
    reasons
}
