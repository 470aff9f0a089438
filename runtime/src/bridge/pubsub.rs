//! Correlation-id rendezvous over a [`MessageChannel`].

use super::is_not_found;
use crate::config::PubSubConfig;
use crate::metrics::RendezvousMetrics;
use composite_core::{
    CompositeError, CompositeResult, CorrelatedMessage, MessageChannel, RequestContext,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval, timeout};
use uuid::Uuid;

const COMPONENT: &str = "pubsub";

/// Publishes lookup requests and waits for the matching reply.
///
/// Only replies whose `correlation_id` equals the request's are acknowledged,
/// redelivered copies included. Everything else pulled along the way (other
/// waiters' replies, undecodable data) is released so it becomes visible again
/// immediately.
#[derive(Clone)]
pub struct PubSubBridge {
    channel: Arc<dyn MessageChannel>,
    request_topic: String,
    response_subscription: String,
    timeout: Duration,
    poll_interval: Duration,
    max_messages: u32,
}

impl std::fmt::Debug for PubSubBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubBridge")
            .field("request_topic", &self.request_topic)
            .field("response_subscription", &self.response_subscription)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PubSubBridge {
    /// Create a bridge over `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn MessageChannel>, config: &PubSubConfig) -> Self {
        Self {
            channel,
            request_topic: config.request_topic.clone(),
            response_subscription: config.response_subscription.clone(),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
            max_messages: config.max_messages.max(1),
        }
    }

    /// Look a breeder up through the rendezvous. Returns the reply's `data`.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::RendezvousTimeout`] if no matching reply arrives in time
    /// - [`CompositeError::NotFound`] if the reply's error says so
    /// - [`CompositeError::Internal`] for any other reply error
    /// - transport failures of the channel
    pub async fn lookup_breeder(
        &self,
        breeder_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Value> {
        self.request("Breeder", breeder_id, "breeder_id", ctx).await
    }

    async fn request(
        &self,
        resource: &'static str,
        id: &str,
        id_field: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Value> {
        let correlation_id = Uuid::new_v4();
        let message = CorrelatedMessage::new(correlation_id).with_field(id_field, id);

        let message_id = self
            .channel
            .publish(&self.request_topic, &message)
            .await
            .map_err(|e| CompositeError::from_channel(COMPONENT, e))?;

        tracing::info!(
            %correlation_id,
            request_correlation_id = %ctx.correlation_id(),
            topic = %self.request_topic,
            message_id = %message_id,
            "Published rendezvous request"
        );

        let outcome = timeout(self.timeout, self.await_reply(correlation_id)).await;
        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                RendezvousMetrics::record("error");
                return Err(e);
            }
            Err(_) => {
                RendezvousMetrics::record("timeout");
                tracing::warn!(%correlation_id, waited = ?self.timeout, "Rendezvous timed out");
                return Err(CompositeError::RendezvousTimeout {
                    correlation_id,
                    waited: self.timeout,
                });
            }
        };

        RendezvousMetrics::record("matched");
        interpret(reply, resource, id)
    }

    async fn await_reply(&self, correlation_id: Uuid) -> CompositeResult<CorrelatedMessage> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let batch = self
                .channel
                .pull(&self.response_subscription, self.max_messages)
                .await
                .map_err(|e| CompositeError::from_channel(COMPONENT, e))?;

            let mut reply = None;
            let mut matched = Vec::new();
            let mut others = Vec::new();
            for received in batch {
                match CorrelatedMessage::from_slice(&received.data) {
                    // Redelivered copies of our reply are acknowledged too.
                    Ok(message) if message.correlation_id == correlation_id => {
                        matched.push(received.ack_id);
                        reply.get_or_insert(message);
                    }
                    Ok(_) => others.push(received.ack_id),
                    Err(e) => {
                        tracing::debug!(ack_id = %received.ack_id, error = %e, "Undecodable reply");
                        others.push(received.ack_id);
                    }
                }
            }

            if !others.is_empty() {
                if let Err(e) = self.channel.release(&self.response_subscription, &others).await {
                    tracing::warn!(error = %e, count = others.len(), "Failed to release messages");
                }
            }

            if let Some(reply) = reply {
                self.channel
                    .acknowledge(&self.response_subscription, &matched)
                    .await
                    .map_err(|e| CompositeError::from_channel(COMPONENT, e))?;
                return Ok(reply);
            }
        }
    }
}

fn interpret(reply: CorrelatedMessage, resource: &'static str, id: &str) -> CompositeResult<Value> {
    match reply.field("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            let message = error
                .as_str()
                .map_or_else(|| error.to_string(), str::to_string);
            return Err(if is_not_found(&message) {
                CompositeError::not_found(resource, id)
            } else {
                CompositeError::Internal(format!("{resource} lookup failed: {message}"))
            });
        }
    }

    match reply.field("data") {
        None | Some(Value::Null) => Err(CompositeError::decode(
            COMPONENT,
            "reply carries neither data nor error",
        )),
        Some(data) => Ok(data.clone()),
    }
}
