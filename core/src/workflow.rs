//! Workflow-execution transport abstraction.
//!
//! An execution is started with a JSON argument and then polled until it
//! reaches a terminal state. The workflow itself reports its outcome as a JSON
//! [`ResultEnvelope`] string in the execution `result`.

use crate::messaging::ChannelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Lifecycle state of an execution.
///
/// Native engine names are accepted on decode: `ACTIVE` and `QUEUED` are
/// running, `CANCELLED` is failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    /// Still running
    #[serde(alias = "ACTIVE", alias = "QUEUED", alias = "STATE_UNSPECIFIED")]
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    #[serde(alias = "CANCELLED")]
    Failed,
}

impl ExecutionState {
    /// `true` once the execution will not change state any more.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Snapshot of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Opaque execution handle
    pub name: String,
    /// Current state
    pub state: ExecutionState,
    /// JSON-encoded result, once succeeded
    #[serde(default)]
    pub result: Option<String>,
    /// Error detail, once failed
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome envelope produced by the workflow: `{code, message?, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// HTTP-like status code set by the workflow
    pub code: u16,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Result data
    #[serde(default)]
    pub data: Option<Value>,
}

/// Starts and inspects workflow executions.
pub trait WorkflowEngine: Send + Sync {
    /// Start `workflow` with `argument`, returning the new execution.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the engine rejects the request.
    fn execute(
        &self,
        workflow: &str,
        argument: &Value,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowExecution, ChannelError>> + Send + '_>>;

    /// Fetch the current state of an execution.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the engine cannot be reached.
    fn execution(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowExecution, ChannelError>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_state_names() {
        let active: ExecutionState = serde_json::from_value(json!("ACTIVE")).unwrap();
        let cancelled: ExecutionState = serde_json::from_value(json!("CANCELLED")).unwrap();
        let succeeded: ExecutionState = serde_json::from_value(json!("SUCCEEDED")).unwrap();

        assert_eq!(active, ExecutionState::Running);
        assert_eq!(cancelled, ExecutionState::Failed);
        assert!(succeeded.is_terminal());
        assert!(!active.is_terminal());
    }

    #[test]
    fn test_envelope_optional_fields() {
        let envelope: ResultEnvelope = serde_json::from_str(r#"{"code": 404}"#).unwrap();
        assert_eq!(envelope.code, 404);
        assert!(envelope.message.is_none());
        assert!(envelope.data.is_none());
    }
}
