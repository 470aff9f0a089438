//! HTTP implementations of the transport traits.
//!
//! - [`PubSubRestChannel`]: Google Cloud Pub/Sub REST API (`:publish`, `:pull`,
//!   `:acknowledge`, `:modifyAckDeadline`)
//! - [`WorkflowsRestEngine`]: Google Cloud Workflows executions API
//! - [`HttpFunction`]: HTTP-triggered notification function

mod function;
mod pubsub;
mod workflows;

pub use function::HttpFunction;
pub use pubsub::PubSubRestChannel;
pub use workflows::WorkflowsRestEngine;

use composite_core::ChannelError;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Send `request` (with an optional bearer token) and decode a JSON answer.
async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    access_token: Option<&str>,
) -> Result<T, ChannelError> {
    let request = match access_token {
        Some(token) => request.bearer_auth(token),
        None => request,
    };

    let response = request
        .send()
        .await
        .map_err(|e| ChannelError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChannelError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ChannelError::Transport(e.to_string()))?;
    if bytes.is_empty() {
        return serde_json::from_slice(b"{}").map_err(|e| ChannelError::Decode(e.to_string()));
    }
    serde_json::from_slice(&bytes).map_err(|e| ChannelError::Decode(e.to_string()))
}
