//! HTTP-triggered notification function.

use composite_core::{
    ChannelError, FunctionResponse, NotificationEnvelope, NotificationFunction, RequestContext,
};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// [`NotificationFunction`] reached by POSTing the envelope to a URL.
///
/// A function that answers with its own `{statusCode, body}` document has that
/// status reported; anything else is reported with the HTTP status. The
/// request carries the same context headers as every sibling-service call.
#[derive(Clone, Debug)]
pub struct HttpFunction {
    http: Client,
    url: String,
}

impl HttpFunction {
    /// Create a function client sharing `http`.
    #[must_use]
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

impl NotificationFunction for HttpFunction {
    fn invoke(
        &self,
        envelope: &NotificationEnvelope,
        ctx: &RequestContext,
    ) -> Pin<Box<dyn Future<Output = Result<FunctionResponse, ChannelError>> + Send + '_>> {
        let envelope = envelope.clone();
        let headers = ctx.outbound_headers();
        Box::pin(async move {
            let request = headers
                .into_iter()
                .fold(self.http.post(&self.url), |request, (name, value)| {
                    request.header(name, value)
                });
            let response = request
                .json(&envelope)
                .send()
                .await
                .map_err(|e| ChannelError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| ChannelError::Transport(e.to_string()))?;

            if let Ok(reported) = serde_json::from_str::<FunctionResponse>(&text) {
                return Ok(reported);
            }

            let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
            Ok(FunctionResponse { status, body })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope() -> NotificationEnvelope {
        NotificationEnvelope {
            body: r#"{"pet_id":"7"}"#.into(),
        }
    }

    #[tokio::test]
    async fn test_reported_status_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_json(json!({"body": "{\"pet_id\":\"7\"}"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"statusCode": 500, "body": "smtp down"})),
            )
            .mount(&server)
            .await;

        let function = HttpFunction::new(Client::new(), format!("{}/notify", server.uri()));
        let response = function
            .invoke(&envelope(), &RequestContext::generate())
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.body, json!("smtp down"));
    }

    #[tokio::test]
    async fn test_http_status_used_for_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("sent"))
            .mount(&server)
            .await;

        let function = HttpFunction::new(Client::new(), server.uri());
        let response = function
            .invoke(&envelope(), &RequestContext::generate())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!("sent"));
    }

    #[tokio::test]
    async fn test_context_headers_are_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-correlation-id", "trace-abc-123"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statusCode": 200})))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = RequestContext::new("trace-abc-123").with_authorization("Bearer abc");
        let function = HttpFunction::new(Client::new(), server.uri());
        let response = function.invoke(&envelope(), &ctx).await.unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_unreachable_function_is_transport_error() {
        let function = HttpFunction::new(Client::new(), "http://127.0.0.1:1/notify");
        let err = function
            .invoke(&envelope(), &RequestContext::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
    }
}
