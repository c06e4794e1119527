//! HTTP client for the remote workflow-execution service.
//!
//! Issues one streaming run request per step and reduces the decoded
//! lifecycle events to a single output map. Outputs are aggregated from two
//! granularities because different remote implementations surface results at
//! either one: `node_finished` fragments accumulate by shallow merge, and the
//! final `workflow_finished` aggregate merges over them, winning on key
//! collisions.

use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use stepchain_core::invoker::StepInvoker;
use stepchain_types::JsonMap;
use stepchain_types::error::InvokeError;
use stepchain_types::event::LifecycleEvent;

use crate::stream::decode_lifecycle_stream;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// JSON body of a streaming run request.
#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    inputs: &'a JsonMap,
    response_mode: &'static str,
    user: &'a str,
}

// ---------------------------------------------------------------------------
// HttpWorkflowClient
// ---------------------------------------------------------------------------

/// Reqwest-backed [`StepInvoker`] for the remote workflow service.
#[derive(Debug, Clone)]
pub struct HttpWorkflowClient {
    client: reqwest::Client,
    base_url: String,
    /// Opaque end-user identifier passed through on every run request.
    user: String,
}

impl HttpWorkflowClient {
    /// Create a client against `base_url` (no trailing slash), attributing
    /// runs to the opaque `user` id.
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            user: user.into(),
        }
    }

    fn run_url(&self, workflow_id: &str) -> String {
        format!("{}/workflows/{}/run", self.base_url, workflow_id)
    }
}

impl StepInvoker for HttpWorkflowClient {
    async fn invoke(
        &self,
        workflow_id: &str,
        api_key: &SecretString,
        inputs: &JsonMap,
    ) -> Result<JsonMap, InvokeError> {
        let body = RunRequest {
            inputs,
            response_mode: "streaming",
            user: &self.user,
        };

        let response = self
            .client
            .post(self.run_url(workflow_id))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| InvokeError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                workflow_id,
                status = status.as_u16(),
                "workflow run request rejected"
            );
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let events = decode_lifecycle_stream(response.bytes_stream());
        reduce_events(events).await
    }
}

// ---------------------------------------------------------------------------
// Event reduction
// ---------------------------------------------------------------------------

/// Reduce a decoded event sequence to the run's output map.
///
/// Decoder failures propagate unchanged. A `Finished` event carrying an
/// error field fails the run with [`InvokeError::Upstream`] instead of
/// returning outputs; a stream that ends without `Finished` returns whatever
/// the node fragments accumulated.
pub(crate) async fn reduce_events<S>(events: S) -> Result<JsonMap, InvokeError>
where
    S: Stream<Item = Result<LifecycleEvent, InvokeError>>,
{
    let mut node_outputs = JsonMap::new();
    let mut events = std::pin::pin!(events);

    while let Some(event) = events.next().await {
        match event? {
            LifecycleEvent::Started { run_id } => {
                tracing::debug!(run_id = run_id.as_str(), "workflow run started");
            }
            LifecycleEvent::NodeStarted { .. } => {}
            LifecycleEvent::NodeFinished { outputs } => {
                if let Some(fragment) = outputs {
                    for (key, value) in fragment {
                        node_outputs.insert(key, value);
                    }
                }
            }
            LifecycleEvent::Finished { outputs, error } => {
                if let Some(message) = error {
                    return Err(InvokeError::Upstream(message));
                }
                let mut merged = node_outputs;
                if let Some(aggregate) = outputs {
                    for (key, value) in aggregate {
                        merged.insert(key, value);
                    }
                }
                return Ok(merged);
            }
        }
    }

    tracing::debug!("event stream exhausted without a terminal record");
    Ok(node_outputs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
