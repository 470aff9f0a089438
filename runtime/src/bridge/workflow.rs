//! Poll-based tracking of workflow executions.

use crate::config::WorkflowConfig;
use crate::metrics::WorkflowMetrics;
use composite_core::{
    CompositeError, CompositeResult, ExecutionState, RequestContext, ResultEnvelope,
    WorkflowEngine, WorkflowExecution,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval, timeout};

const COMPONENT: &str = "workflows";

/// Starts workflow executions and polls them to a terminal state.
#[derive(Clone)]
pub struct WorkflowBridge {
    engine: Arc<dyn WorkflowEngine>,
    customer_workflow: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for WorkflowBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowBridge")
            .field("customer_workflow", &self.customer_workflow)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl WorkflowBridge {
    /// Create a bridge over `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn WorkflowEngine>, config: &WorkflowConfig) -> Self {
        Self {
            engine,
            customer_workflow: config.customer_workflow.clone(),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
        }
    }

    /// Run the customer lookup workflow. Returns the envelope's `data`.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::NotFound`] when the workflow reports code 404
    /// - [`CompositeError::Upstream`] for any other non-200 code
    /// - [`CompositeError::WorkflowFailed`] when the execution fails (500)
    /// - [`CompositeError::WorkflowTimeout`] when it does not finish in time (408)
    pub async fn lookup_customer(
        &self,
        customer_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Value> {
        let argument = json!({ "customer_id": customer_id });
        self.run(&self.customer_workflow, &argument, "Customer", customer_id, ctx)
            .await
    }

    async fn run(
        &self,
        workflow: &str,
        argument: &Value,
        resource: &'static str,
        id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Value> {
        let started = self
            .engine
            .execute(workflow, argument)
            .await
            .map_err(|e| CompositeError::from_channel(COMPONENT, e))?;

        tracing::info!(
            execution = %started.name,
            workflow,
            correlation_id = %ctx.correlation_id(),
            "Started workflow execution"
        );

        let finished = match timeout(self.timeout, self.await_terminal(started.clone())).await {
            Ok(Ok(execution)) => execution,
            Ok(Err(e)) => {
                WorkflowMetrics::record("error");
                return Err(e);
            }
            Err(_) => {
                WorkflowMetrics::record("timeout");
                tracing::warn!(
                    execution = %started.name,
                    waited = ?self.timeout,
                    "Workflow timed out"
                );
                return Err(CompositeError::WorkflowTimeout {
                    execution: started.name,
                    waited: self.timeout,
                });
            }
        };

        match finished.state {
            ExecutionState::Succeeded => {
                WorkflowMetrics::record("succeeded");
                interpret(&finished, resource, id)
            }
            ExecutionState::Failed | ExecutionState::Running => {
                WorkflowMetrics::record("failed");
                Err(CompositeError::WorkflowFailed {
                    detail: finished
                        .error
                        .unwrap_or_else(|| "no error detail reported".to_string()),
                    execution: finished.name,
                })
            }
        }
    }

    async fn await_terminal(
        &self,
        execution: WorkflowExecution,
    ) -> CompositeResult<WorkflowExecution> {
        if execution.state.is_terminal() {
            return Ok(execution);
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the execution was just started.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let current = self
                .engine
                .execution(&execution.name)
                .await
                .map_err(|e| CompositeError::from_channel(COMPONENT, e))?;
            tracing::debug!(execution = %current.name, state = ?current.state, "Polled execution");
            if current.state.is_terminal() {
                return Ok(current);
            }
        }
    }
}

fn interpret(
    execution: &WorkflowExecution,
    resource: &'static str,
    id: &str,
) -> CompositeResult<Value> {
    let raw = execution.result.as_deref().unwrap_or("null");
    let envelope: ResultEnvelope = serde_json::from_str(raw)
        .map_err(|e| CompositeError::decode(format!("workflow result of {}", execution.name), e))?;

    match envelope.code {
        200 => Ok(envelope.data.unwrap_or(Value::Null)),
        404 => Err(CompositeError::not_found(resource, id)),
        code => Err(CompositeError::Upstream {
            service: COMPONENT.to_string(),
            status: code,
            body: envelope.message.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use composite_testing::ScriptedWorkflowEngine;

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            endpoint: String::new(),
            project_id: "test".into(),
            location: "local".into(),
            customer_workflow: "customer-lookup".into(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_envelope_data() {
        let engine = ScriptedWorkflowEngine::succeeding(
            &json!({"code": 200, "data": {"id": "c1", "name": "Ann", "email": "ann@example.com"}}),
        );
        let bridge = WorkflowBridge::new(Arc::new(engine.clone()), &config());

        let data = bridge
            .lookup_customer("c1", &RequestContext::generate())
            .await
            .unwrap();

        assert_eq!(data["name"], "Ann");
        assert_eq!(engine.executions()[0].1, json!({"customer_id": "c1"}));
        assert_eq!(engine.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedded_404_is_not_found() {
        let engine = ScriptedWorkflowEngine::succeeding(&json!({"code": 404, "message": "nope"}));
        let bridge = WorkflowBridge::new(Arc::new(engine), &config());

        let err = bridge
            .lookup_customer("c9", &RequestContext::generate())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedded_error_code_propagates() {
        let engine = ScriptedWorkflowEngine::succeeding(&json!({"code": 503, "message": "busy"}));
        let bridge = WorkflowBridge::new(Arc::new(engine), &config());

        let err = bridge
            .lookup_customer("c1", &RequestContext::generate())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 503);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_execution_is_500() {
        let engine = ScriptedWorkflowEngine::failing("step lookup raised KeyError");
        let bridge = WorkflowBridge::new(Arc::new(engine), &config());

        let err = bridge
            .lookup_customer("c1", &RequestContext::generate())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("KeyError"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_finishing_is_408() {
        let engine = ScriptedWorkflowEngine::never_finishing();
        let bridge = WorkflowBridge::new(Arc::new(engine.clone()), &config());

        let err = bridge
            .lookup_customer("c1", &RequestContext::generate())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 408);
        // One poll per second until the 30 s timeout.
        assert!(engine.polls() <= 30);
    }
}
