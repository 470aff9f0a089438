//! In-memory transport implementations
//!
//! Fast, deterministic stand-ins for the external transports:
//! - [`InMemoryMessageChannel`]: topic/subscription queues with leases
//! - [`ScriptedWorkflowEngine`]: executions that walk a fixed script of states
//! - [`RecordingFunction`]: notification function with a canned answer

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use composite_core::{
    ChannelError, CorrelatedMessage, ExecutionState, FunctionResponse, MessageChannel,
    NotificationEnvelope, NotificationFunction, ReceivedMessage, RequestContext, WorkflowEngine,
    WorkflowExecution,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

type Responder = Arc<dyn Fn(&CorrelatedMessage) -> Value + Send + Sync>;

#[derive(Default)]
struct ChannelState {
    published: Vec<(String, CorrelatedMessage)>,
    queues: HashMap<String, VecDeque<ReceivedMessage>>,
    leased: HashMap<String, (String, ReceivedMessage)>,
    acknowledged: Vec<Vec<u8>>,
    released: usize,
    next_id: u64,
}

impl ChannelState {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn enqueue(&mut self, subscription: &str, data: Vec<u8>) {
        let ack_id = self.next("ack");
        self.queues
            .entry(subscription.to_string())
            .or_default()
            .push_back(ReceivedMessage::new(ack_id, data));
    }
}

/// In-memory pub/sub with lease semantics.
///
/// Pulled messages stay leased until acknowledged (gone for good) or released
/// (back at the end of the queue). An optional responder turns every published
/// message into a reply on a subscription, echoing the request's correlation id.
///
/// # Example
///
/// ```
/// use composite_testing::InMemoryMessageChannel;
/// use composite_core::{CorrelatedMessage, MessageChannel};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = InMemoryMessageChannel::replying("replies", |_| json!({"data": 1}));
/// let request = CorrelatedMessage::new(uuid::Uuid::new_v4());
///
/// channel.publish("requests", &request).await?;
/// let batch = channel.pull("replies", 10).await?;
/// assert_eq!(batch.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryMessageChannel {
    state: Arc<RwLock<ChannelState>>,
    responder: Option<(String, Responder)>,
    duplicate_replies: bool,
}

impl std::fmt::Debug for InMemoryMessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageChannel")
            .field("has_responder", &self.responder.is_some())
            .finish_non_exhaustive()
    }
}

impl InMemoryMessageChannel {
    /// Channel with no responder: nothing ever arrives unless enqueued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel that answers every publish on `subscription`.
    ///
    /// `reply` returns the reply fields (typically `{"data": ...}` or
    /// `{"error": "..."}`); the request's correlation id is added to them.
    #[must_use]
    pub fn replying<F>(subscription: impl Into<String>, reply: F) -> Self
    where
        F: Fn(&CorrelatedMessage) -> Value + Send + Sync + 'static,
    {
        Self {
            state: Arc::default(),
            responder: Some((subscription.into(), Arc::new(reply))),
            duplicate_replies: false,
        }
    }

    /// Deliver every reply twice, each copy with its own ack id, the way
    /// Pub/Sub redelivers when an ack deadline lapses.
    #[must_use]
    pub fn with_duplicate_replies(mut self) -> Self {
        self.duplicate_replies = true;
        self
    }

    /// Put raw bytes on `subscription`.
    pub fn enqueue(&self, subscription: &str, data: Vec<u8>) {
        self.state.write().unwrap().enqueue(subscription, data);
    }

    /// Put a JSON value on `subscription`.
    pub fn enqueue_json(&self, subscription: &str, value: &Value) {
        self.enqueue(subscription, value.to_string().into_bytes());
    }

    /// Everything published so far, with its topic.
    #[must_use]
    pub fn published(&self) -> Vec<(String, CorrelatedMessage)> {
        self.state.read().unwrap().published.clone()
    }

    /// Data of every acknowledged message, in acknowledgement order.
    #[must_use]
    pub fn acknowledged(&self) -> Vec<Value> {
        self.state
            .read()
            .unwrap()
            .acknowledged
            .iter()
            .map(|data| serde_json::from_slice(data).unwrap_or(Value::Null))
            .collect()
    }

    /// Number of release operations' messages handed back.
    #[must_use]
    pub fn released(&self) -> usize {
        self.state.read().unwrap().released
    }

    /// Messages waiting (not leased) on `subscription`.
    #[must_use]
    pub fn pending(&self, subscription: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .queues
            .get(subscription)
            .map_or(0, VecDeque::len)
    }
}

impl MessageChannel for InMemoryMessageChannel {
    fn publish(
        &self,
        topic: &str,
        message: &CorrelatedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChannelError>> + Send + '_>> {
        let topic = topic.to_string();
        let message = message.clone();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let id = state.next("msg");

            if let Some((subscription, reply)) = &self.responder {
                let mut fields = match reply(&message) {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("data".to_string(), other);
                        map
                    }
                };
                fields.insert(
                    "correlation_id".to_string(),
                    Value::String(message.correlation_id.to_string()),
                );
                let data = Value::Object(fields).to_string().into_bytes();
                if self.duplicate_replies {
                    state.enqueue(subscription, data.clone());
                }
                state.enqueue(subscription, data);
            }

            state.published.push((topic, message));
            Ok(id)
        })
    }

    fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ReceivedMessage>, ChannelError>> + Send + '_>> {
        let subscription = subscription.to_string();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let mut batch = Vec::new();
            while batch.len() < max_messages as usize {
                let Some(message) = state
                    .queues
                    .get_mut(&subscription)
                    .and_then(VecDeque::pop_front)
                else {
                    break;
                };
                state
                    .leased
                    .insert(message.ack_id.clone(), (subscription.clone(), message.clone()));
                batch.push(message);
            }
            Ok(batch)
        })
    }

    fn acknowledge(
        &self,
        _subscription: &str,
        ack_ids: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + '_>> {
        let ack_ids = ack_ids.to_vec();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            for ack_id in ack_ids {
                if let Some((_, message)) = state.leased.remove(&ack_id) {
                    state.acknowledged.push(message.data);
                }
            }
            Ok(())
        })
    }

    fn release(
        &self,
        _subscription: &str,
        ack_ids: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + '_>> {
        let ack_ids = ack_ids.to_vec();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            for ack_id in ack_ids {
                if let Some((subscription, message)) = state.leased.remove(&ack_id) {
                    state.released += 1;
                    state.queues.entry(subscription).or_default().push_back(message);
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
struct Step {
    state: ExecutionState,
    result: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct EngineState {
    executions: Vec<(String, Value)>,
    polls: usize,
}

/// Workflow engine whose executions walk a fixed script.
///
/// Each execution starts `RUNNING`; every status poll advances one step, and
/// the final step repeats forever.
#[derive(Debug, Clone)]
pub struct ScriptedWorkflowEngine {
    script: Arc<Vec<Step>>,
    state: Arc<RwLock<EngineState>>,
}

impl ScriptedWorkflowEngine {
    fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            script: Arc::new(steps),
            state: Arc::default(),
        }
    }

    fn running() -> Step {
        Step {
            state: ExecutionState::Running,
            result: None,
            error: None,
        }
    }

    /// Runs for one poll, then succeeds with `envelope` as its result.
    #[must_use]
    pub fn succeeding(envelope: &Value) -> Self {
        Self::from_steps(vec![
            Self::running(),
            Step {
                state: ExecutionState::Succeeded,
                result: Some(envelope.to_string()),
                error: None,
            },
        ])
    }

    /// Runs for one poll, then fails with `detail`.
    #[must_use]
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::from_steps(vec![
            Self::running(),
            Step {
                state: ExecutionState::Failed,
                result: None,
                error: Some(detail.into()),
            },
        ])
    }

    /// Never leaves `RUNNING`.
    #[must_use]
    pub fn never_finishing() -> Self {
        Self::from_steps(vec![Self::running()])
    }

    /// Every `(workflow, argument)` started so far.
    #[must_use]
    pub fn executions(&self) -> Vec<(String, Value)> {
        self.state.read().unwrap().executions.clone()
    }

    /// Number of status polls served.
    #[must_use]
    pub fn polls(&self) -> usize {
        self.state.read().unwrap().polls
    }

    fn snapshot(name: String, step: &Step) -> WorkflowExecution {
        WorkflowExecution {
            name,
            state: step.state,
            result: step.result.clone(),
            error: step.error.clone(),
        }
    }
}

impl WorkflowEngine for ScriptedWorkflowEngine {
    fn execute(
        &self,
        workflow: &str,
        argument: &Value,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowExecution, ChannelError>> + Send + '_>> {
        let workflow = workflow.to_string();
        let argument = argument.clone();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let name = format!(
                "projects/test/locations/local/workflows/{workflow}/executions/{}",
                state.executions.len() + 1
            );
            state.executions.push((workflow, argument));
            Ok(Self::snapshot(name, &Self::running()))
        })
    }

    fn execution(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowExecution, ChannelError>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.polls += 1;
            let index = state.polls.min(self.script.len()) - 1;
            Ok(Self::snapshot(name, &self.script[index]))
        })
    }
}

/// Notification function that records envelopes and returns a canned answer.
#[derive(Debug, Clone)]
pub struct RecordingFunction {
    answer: Result<FunctionResponse, ChannelError>,
    invocations: Arc<RwLock<Vec<(NotificationEnvelope, String)>>>,
}

impl RecordingFunction {
    /// Answers with `status` and an empty body.
    #[must_use]
    pub fn responding(status: u16) -> Self {
        Self {
            answer: Ok(FunctionResponse {
                status,
                body: Value::Null,
            }),
            invocations: Arc::default(),
        }
    }

    /// Fails every invocation with `error`.
    #[must_use]
    pub fn failing(error: ChannelError) -> Self {
        Self {
            answer: Err(error),
            invocations: Arc::default(),
        }
    }

    /// Envelopes received so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<NotificationEnvelope> {
        self.invocations
            .read()
            .unwrap()
            .iter()
            .map(|(envelope, _)| envelope.clone())
            .collect()
    }

    /// Correlation id each invocation was made under.
    #[must_use]
    pub fn correlation_ids(&self) -> Vec<String> {
        self.invocations
            .read()
            .unwrap()
            .iter()
            .map(|(_, correlation_id)| correlation_id.clone())
            .collect()
    }
}

impl NotificationFunction for RecordingFunction {
    fn invoke(
        &self,
        envelope: &NotificationEnvelope,
        ctx: &RequestContext,
    ) -> Pin<Box<dyn Future<Output = Result<FunctionResponse, ChannelError>> + Send + '_>> {
        let envelope = envelope.clone();
        let correlation_id = ctx.correlation_id().to_string();
        Box::pin(async move {
            self.invocations.write().unwrap().push((envelope, correlation_id));
            self.answer.clone()
        })
    }
}
