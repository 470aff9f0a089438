//! Google Cloud Pub/Sub over its REST API.

use super::send_json;
use crate::config::PubSubConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use composite_core::{ChannelError, CorrelatedMessage, MessageChannel, ReceivedMessage};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<WireReceived>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReceived {
    ack_id: String,
    message: WireMessage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    data: String,
}

/// [`MessageChannel`] over `https://pubsub.googleapis.com/v1`.
///
/// Message data is base64 on the wire. Releasing a message sets its ack
/// deadline to zero so it is redelivered immediately.
#[derive(Clone)]
pub struct PubSubRestChannel {
    http: Client,
    endpoint: String,
    project_id: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for PubSubRestChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubRestChannel")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl PubSubRestChannel {
    /// Create a channel sharing `http`.
    #[must_use]
    pub fn new(http: Client, config: &PubSubConfig, access_token: Option<String>) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            access_token,
        }
    }

    fn topic_url(&self, topic: &str, verb: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{topic}:{verb}",
            self.endpoint, self.project_id
        )
    }

    fn subscription_url(&self, subscription: &str, verb: &str) -> String {
        format!(
            "{}/v1/projects/{}/subscriptions/{subscription}:{verb}",
            self.endpoint, self.project_id
        )
    }

    async fn post<T: DeserializeOwned>(&self, url: String, body: Value) -> Result<T, ChannelError> {
        send_json(self.http.post(url).json(&body), self.access_token.as_deref()).await
    }
}

impl MessageChannel for PubSubRestChannel {
    fn publish(
        &self,
        topic: &str,
        message: &CorrelatedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChannelError>> + Send + '_>> {
        let url = self.topic_url(topic, "publish");
        let encoded = message.to_bytes().map(|bytes| STANDARD.encode(bytes));
        Box::pin(async move {
            let wire = WireMessage { data: encoded? };
            let body = json!({ "messages": [wire] });
            let response: PublishResponse = self.post(url, body).await?;
            response
                .message_ids
                .into_iter()
                .next()
                .ok_or_else(|| ChannelError::Decode("publish returned no message id".into()))
        })
    }

    fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ReceivedMessage>, ChannelError>> + Send + '_>> {
        let url = self.subscription_url(subscription, "pull");
        Box::pin(async move {
            let response: PullResponse = self
                .post(url, json!({ "maxMessages": max_messages }))
                .await?;
            response
                .received_messages
                .into_iter()
                .map(|received| {
                    STANDARD
                        .decode(received.message.data.as_bytes())
                        .map(|data| ReceivedMessage::new(received.ack_id, data))
                        .map_err(|e| ChannelError::Decode(e.to_string()))
                })
                .collect()
        })
    }

    fn acknowledge(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + '_>> {
        let url = self.subscription_url(subscription, "acknowledge");
        let body = json!({ "ackIds": ack_ids });
        Box::pin(async move {
            let _: Value = self.post(url, body).await?;
            Ok(())
        })
    }

    fn release(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + '_>> {
        let url = self.subscription_url(subscription, "modifyAckDeadline");
        let body = json!({ "ackIds": ack_ids, "ackDeadlineSeconds": 0 });
        Box::pin(async move {
            let _: Value = self.post(url, body).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(server: &MockServer) -> PubSubRestChannel {
        let config = PubSubConfig {
            endpoint: server.uri(),
            project_id: "proj".into(),
            request_topic: "requests".into(),
            response_subscription: "replies".into(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            max_messages: 10,
        };
        PubSubRestChannel::new(Client::new(), &config, Some("token".into()))
    }

    #[tokio::test]
    async fn test_publish_base64_encodes_data() {
        let server = MockServer::start().await;
        let message = CorrelatedMessage::new(Uuid::nil()).with_field("breeder_id", "42");
        let encoded = STANDARD.encode(message.to_bytes().unwrap());

        Mock::given(method("POST"))
            .and(path("/v1/projects/proj/topics/requests:publish"))
            .and(header("authorization", "Bearer token"))
            .and(body_json(json!({"messages": [{"data": encoded}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messageIds": ["m-1"]})))
            .expect(1)
            .mount(&server)
            .await;

        let id = channel(&server).publish("requests", &message).await.unwrap();
        assert_eq!(id, "m-1");
    }

    #[tokio::test]
    async fn test_pull_decodes_messages_and_tolerates_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/proj/subscriptions/replies:pull"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "receivedMessages": [{
                    "ackId": "a-1",
                    "message": {"data": STANDARD.encode(b"{\"x\":1}"), "messageId": "1"}
                }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/proj/subscriptions/replies:pull"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let channel = channel(&server);
        let batch = channel.pull("replies", 10).await.unwrap();
        assert_eq!(batch, vec![ReceivedMessage::new("a-1", b"{\"x\":1}".to_vec())]);
        assert!(channel.pull("replies", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_zeroes_ack_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/proj/subscriptions/replies:modifyAckDeadline"))
            .and(body_json(json!({"ackIds": ["a-1"], "ackDeadlineSeconds": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        channel(&server)
            .release("replies", &["a-1".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let err = channel(&server)
            .acknowledge("replies", &["a-1".to_string()])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChannelError::Status {
                status: 403,
                body: "denied".into()
            }
        );
    }
}
