//! Publish/subscribe transport abstraction for correlation-id rendezvous.
//!
//! The composite service publishes a request message to a topic and then pulls
//! a response subscription until a message carrying the same correlation id
//! shows up. [`MessageChannel`] captures exactly the four operations that
//! pattern needs.
//!
//! # Delivery model
//!
//! ```text
//!  publish(topic, {correlation_id: C, ...})
//!          │
//!          ▼
//!   ┌──────────────┐        ┌──────────────┐
//!   │ request topic│ ─────► │   worker     │
//!   └──────────────┘        └──────┬───────┘
//!                                  │ {correlation_id: C, data | error}
//!                                  ▼
//!                          ┌───────────────┐
//!   pull(subscription) ◄── │ response sub. │
//!                          └───────────────┘
//!      match C  → acknowledge
//!      other    → release (redelivered to other waiters)
//! ```
//!
//! Pulled messages are leased: until they are acknowledged or released, the
//! subscription does not hand them to anyone else.
//!
//! # Implementations
//!
//! - `PubSubRestChannel` in `composite-runtime` (Google Pub/Sub REST API)
//! - `InMemoryMessageChannel` in `composite-testing`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by transport adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("Remote returned status {status}: {body}")]
    Status {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// The remote answer could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// A message that carries a correlation id alongside arbitrary JSON fields.
///
/// On the wire the correlation id is a sibling of the payload fields:
/// `{"correlation_id": "...", "breeder_id": "42"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedMessage {
    /// Identifies one logical request across the pub/sub boundary.
    pub correlation_id: Uuid,
    /// Remaining fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl CorrelatedMessage {
    /// Create an empty message for `correlation_id`.
    #[must_use]
    pub fn new(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            payload: Map::new(),
        }
    }

    /// Add a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Read a payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Encode as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Decode`] if the payload cannot be serialized.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChannelError> {
        serde_json::to_vec(self).map_err(|e| ChannelError::Decode(e.to_string()))
    }

    /// Decode from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Decode`] when the bytes are not a JSON object
    /// with a UUID `correlation_id`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ChannelError> {
        serde_json::from_slice(bytes).map_err(|e| ChannelError::Decode(e.to_string()))
    }
}

/// One leased message pulled from a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Lease handle used to acknowledge or release the message
    pub ack_id: String,
    /// Raw message data
    pub data: Vec<u8>,
}

impl ReceivedMessage {
    /// Create a received message.
    #[must_use]
    pub fn new(ack_id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            ack_id: ack_id.into(),
            data,
        }
    }
}

/// Topic/subscription transport used by the pub/sub bridge.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the bridge can hold an
/// `Arc<dyn MessageChannel>` chosen at startup.
pub trait MessageChannel: Send + Sync {
    /// Publish a message to `topic`, returning the transport's message id.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the publish is rejected or never completes.
    fn publish(
        &self,
        topic: &str,
        message: &CorrelatedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChannelError>> + Send + '_>>;

    /// Pull up to `max_messages` leased messages. May return an empty batch.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] on transport failure.
    fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ReceivedMessage>, ChannelError>> + Send + '_>>;

    /// Acknowledge messages so they are never delivered again.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] on transport failure.
    fn acknowledge(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + '_>>;

    /// Give up the lease on messages so they become visible again immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] on transport failure.
    fn release(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + '_>>;
}
