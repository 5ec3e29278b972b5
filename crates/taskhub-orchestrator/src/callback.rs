use serde::Serialize;
use std::time::Duration;
use taskhub_core::{TaskExecution, TaskStatus};
use tracing::{info, warn};
use uuid::Uuid;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Body POSTed to an execution's `callback_url` when it reaches a terminal state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub execution_id: Uuid,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TaskExecution> for CallbackPayload {
    fn from(execution: &TaskExecution) -> Self {
        Self {
            execution_id: execution.id,
            status: execution.status,
            result: execution.result.clone(),
            error: execution.error.clone(),
        }
    }
}

/// Delivers completion notifications. Delivery is attempted once; failures
/// are logged and never retried.
pub struct CallbackNotifier {
    client: reqwest::Client,
}

impl CallbackNotifier {
    pub fn new() -> Self {
        Self::with_timeout(CALLBACK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for callbacks");
                reqwest::Client::new()
            });
        Self { client }
    }

    /// POST `payload` to `url`. Returns whether the endpoint answered 2xx.
    pub async fn notify(&self, url: &str, payload: &CallbackPayload) -> bool {
        match self.client.post(url).json(payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(
                    execution_id = %payload.execution_id,
                    status = %payload.status,
                    "Callback delivered"
                );
                true
            }
            Ok(resp) => {
                warn!(
                    execution_id = %payload.execution_id,
                    url,
                    http_status = resp.status().as_u16(),
                    "Callback rejected"
                );
                false
            }
            Err(e) => {
                warn!(
                    execution_id = %payload.execution_id,
                    url,
                    error = %e,
                    "Callback delivery failed"
                );
                false
            }
        }
    }

    /// Notify the execution's callback URL, if it has one.
    pub async fn notify_execution(&self, execution: &TaskExecution) {
        if let Some(url) = &execution.callback_url {
            self.notify(url, &CallbackPayload::from(execution)).await;
        }
    }
}

impl Default for CallbackNotifier {
    fn default() -> Self {
        Self::new()
    }
}
