//! Webhook input, notification payload and the external function seam.

use crate::context::RequestContext;
use crate::error::CompositeError;
use crate::messaging::ChannelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Inbound webhook body. Every key is optional at decode time so that
/// [`validate`](Self::validate) can report all missing keys at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookPayload {
    /// Breeder of the pet
    #[serde(default, deserialize_with = "optional_id")]
    pub breeder_id: Option<String>,
    /// Pet the customer is interested in
    #[serde(default, deserialize_with = "optional_id")]
    pub pet_id: Option<String>,
    /// Interested customer
    #[serde(default, alias = "customer_id", deserialize_with = "optional_id")]
    pub consumer_id: Option<String>,
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    }))
}

impl WebhookPayload {
    /// Require every key to be present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Validation`] naming every missing key.
    pub fn validate(self) -> Result<WebhookEvent, CompositeError> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        match (
            present(self.breeder_id),
            present(self.pet_id),
            present(self.consumer_id),
        ) {
            (Some(breeder_id), Some(pet_id), Some(consumer_id)) => Ok(WebhookEvent {
                breeder_id,
                pet_id,
                consumer_id,
            }),
            (breeder_id, pet_id, consumer_id) => {
                let missing: Vec<&str> = [
                    ("breeder_id", breeder_id.is_none()),
                    ("pet_id", pet_id.is_none()),
                    ("consumer_id", consumer_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, missing)| missing.then_some(key))
                .collect();
                Err(CompositeError::Validation(format!(
                    "Missing required keys: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// A validated webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Breeder id
    pub breeder_id: String,
    /// Pet id
    pub pet_id: String,
    /// Customer id
    pub consumer_id: String,
}

/// Flat payload handed to the notification function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Recipient
    pub breeder_email: String,
    /// Interested customer
    pub customer_name: String,
    /// Customer contact
    pub customer_email: String,
    /// Pet name
    pub pet_name: String,
    /// Pet id
    pub pet_id: String,
}

/// Envelope sent to the function: the payload JSON-encoded into `body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    /// JSON-encoded [`NotificationPayload`]
    pub body: String,
}

impl NotificationEnvelope {
    /// Encode `payload` into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Internal`] if the payload cannot be encoded.
    pub fn wrap(payload: &NotificationPayload) -> Result<Self, CompositeError> {
        serde_json::to_string(payload)
            .map(|body| Self { body })
            .map_err(|e| CompositeError::Internal(format!("Failed to encode notification: {e}")))
    }
}

/// What the function reported back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Status reported inside the function's own response
    #[serde(alias = "statusCode", alias = "status_code")]
    pub status: u16,
    /// Function response body
    #[serde(default)]
    pub body: Value,
}

/// Overall webhook outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Event processed and notification delivered
    Success,
    /// Event processed but notification delivery failed
    PartialSuccess,
}

/// Body returned by the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookOutcome {
    /// Delivery status
    pub status: DeliveryStatus,
    /// Human-readable summary
    pub message: String,
    /// The payload that was sent
    pub notification: NotificationPayload,
    /// Status reported by the function, when it answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_status: Option<u16>,
}

/// External notification function, invoked synchronously.
pub trait NotificationFunction: Send + Sync {
    /// Invoke the function with `envelope`, forwarding `ctx` like any other
    /// outbound call.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when no response could be obtained.
    fn invoke(
        &self,
        envelope: &NotificationEnvelope,
        ctx: &RequestContext,
    ) -> Pin<Box<dyn Future<Output = Result<FunctionResponse, ChannelError>> + Send + '_>>;
}
