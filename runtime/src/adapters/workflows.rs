//! Google Cloud Workflows executions over REST.

use super::send_json;
use crate::config::WorkflowConfig;
use composite_core::{ChannelError, ExecutionState, WorkflowEngine, WorkflowExecution};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;

/// Execution resource as the API returns it.
#[derive(Debug, Deserialize)]
struct RestExecution {
    name: String,
    state: ExecutionState,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RestError>,
}

#[derive(Debug, Deserialize)]
struct RestError {
    #[serde(default)]
    payload: String,
    #[serde(default)]
    context: String,
}

impl From<RestExecution> for WorkflowExecution {
    fn from(rest: RestExecution) -> Self {
        Self {
            name: rest.name,
            state: rest.state,
            result: rest.result,
            error: rest.error.map(|e| {
                if e.context.is_empty() {
                    e.payload
                } else {
                    format!("{} ({})", e.payload, e.context)
                }
            }),
        }
    }
}

/// [`WorkflowEngine`] over `https://workflowexecutions.googleapis.com/v1`.
#[derive(Clone)]
pub struct WorkflowsRestEngine {
    http: Client,
    endpoint: String,
    project_id: String,
    location: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for WorkflowsRestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowsRestEngine")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl WorkflowsRestEngine {
    /// Create an engine sharing `http`.
    #[must_use]
    pub fn new(http: Client, config: &WorkflowConfig, access_token: Option<String>) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            location: config.location.clone(),
            access_token,
        }
    }
}

impl WorkflowEngine for WorkflowsRestEngine {
    fn execute(
        &self,
        workflow: &str,
        argument: &Value,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowExecution, ChannelError>> + Send + '_>> {
        let url = format!(
            "{}/v1/projects/{}/locations/{}/workflows/{workflow}/executions",
            self.endpoint, self.project_id, self.location
        );
        // The API takes the argument as a JSON-encoded string.
        let body = json!({ "argument": argument.to_string() });
        Box::pin(async move {
            let execution: RestExecution =
                send_json(self.http.post(url).json(&body), self.access_token.as_deref()).await?;
            Ok(execution.into())
        })
    }

    fn execution(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowExecution, ChannelError>> + Send + '_>> {
        let url = format!("{}/v1/{}", self.endpoint, name.trim_start_matches('/'));
        Box::pin(async move {
            let execution: RestExecution =
                send_json(self.http.get(url), self.access_token.as_deref()).await?;
            Ok(execution.into())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EXECUTION: &str =
        "projects/proj/locations/us-central1/workflows/customer-lookup/executions/e-1";

    fn engine(server: &MockServer) -> WorkflowsRestEngine {
        let config = WorkflowConfig {
            endpoint: server.uri(),
            project_id: "proj".into(),
            location: "us-central1".into(),
            customer_workflow: "customer-lookup".into(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        };
        WorkflowsRestEngine::new(Client::new(), &config, None)
    }

    #[tokio::test]
    async fn test_execute_sends_string_argument() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/proj/locations/us-central1/workflows/customer-lookup/executions",
            ))
            .and(body_json(json!({"argument": "{\"customer_id\":\"9\"}"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": EXECUTION,
                "state": "ACTIVE",
                "argument": "{\"customer_id\":\"9\"}"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let execution = engine(&server)
            .execute("customer-lookup", &json!({"customer_id": "9"}))
            .await
            .unwrap();

        assert_eq!(execution.name, EXECUTION);
        assert_eq!(execution.state, ExecutionState::Running);
    }

    #[tokio::test]
    async fn test_failed_execution_flattens_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/{EXECUTION}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": EXECUTION,
                "state": "FAILED",
                "error": {"payload": "boom", "context": "step lookup"}
            })))
            .mount(&server)
            .await;

        let execution = engine(&server).execution(EXECUTION).await.unwrap();

        assert_eq!(execution.state, ExecutionState::Failed);
        assert_eq!(execution.error.as_deref(), Some("boom (step lookup)"));
    }
}
