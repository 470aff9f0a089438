//! Typed HTTP client for one sibling service.
//!
//! Every request carries the caller's correlation id and, when present, the
//! caller's `Authorization` header. Non-2xx responses become
//! [`CompositeError::Upstream`] with the upstream status and body; requests that
//! never produce a response become [`CompositeError::Transport`].

use crate::metrics::UpstreamMetrics;
use composite_core::{CompositeError, CompositeResult, QueryParams, RequestContext, Service};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Build the process-wide HTTP client.
///
/// # Errors
///
/// Returns [`CompositeError::Internal`] if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> CompositeResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CompositeError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Client bound to one sibling service's base URL.
#[derive(Clone, Debug)]
pub struct ResourceClient {
    http: Client,
    service: Service,
    base_url: String,
}

impl ResourceClient {
    /// Create a client. `http` is shared, so cloning it is cheap.
    #[must_use]
    pub fn new(http: Client, service: Service, base_url: impl Into<String>) -> Self {
        Self {
            http,
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/{path}`. The collection itself is `path = ""`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Path of a single item: `{id}/`.
    #[must_use]
    pub fn item(id: &str) -> String {
        format!("{id}/")
    }

    /// GET and decode.
    ///
    /// # Errors
    ///
    /// Upstream, transport and decode failures.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryParams,
        ctx: &RequestContext,
    ) -> CompositeResult<T> {
        let response = self
            .execute(self.http.get(self.url(path)).query(query.pairs()), ctx)
            .await?;
        self.decode(response).await
    }

    /// GET and decode, mapping 404 to `None`.
    ///
    /// # Errors
    ///
    /// Upstream (other than 404), transport and decode failures.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Option<T>> {
        match self.get(path, &QueryParams::default(), ctx).await {
            Ok(value) => Ok(Some(value)),
            Err(CompositeError::Upstream { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET as untyped JSON.
    ///
    /// # Errors
    ///
    /// Upstream, transport and decode failures.
    pub async fn get_value(&self, path: &str, ctx: &RequestContext) -> CompositeResult<Value> {
        self.get(path, &QueryParams::default(), ctx).await
    }

    /// POST a JSON body and decode the response.
    ///
    /// # Errors
    ///
    /// Upstream, transport and decode failures.
    pub async fn post<B, T>(&self, path: &str, body: &B, ctx: &RequestContext) -> CompositeResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.http.post(self.url(path)).json(body), ctx)
            .await?;
        self.decode(response).await
    }

    /// PUT a JSON body and decode the response.
    ///
    /// # Errors
    ///
    /// Upstream, transport and decode failures.
    pub async fn put<B, T>(&self, path: &str, body: &B, ctx: &RequestContext) -> CompositeResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.http.put(self.url(path)).json(body), ctx)
            .await?;
        self.decode(response).await
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        ctx: &RequestContext,
    ) -> CompositeResult<Response> {
        let request = ctx
            .outbound_headers()
            .into_iter()
            .fold(request, |request, (name, value)| request.header(name, value));

        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                UpstreamMetrics::record(self.service.as_str(), "transport_error", elapsed);
                tracing::warn!(
                    service = self.service.as_str(),
                    correlation_id = %ctx.correlation_id(),
                    error = %e,
                    "Upstream request failed"
                );
                return Err(CompositeError::Transport {
                    service: self.service.as_str().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        tracing::debug!(
            service = self.service.as_str(),
            correlation_id = %ctx.correlation_id(),
            url = %response.url(),
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis(),
            "Upstream response"
        );

        if status.is_success() {
            UpstreamMetrics::record(self.service.as_str(), "success", elapsed);
            return Ok(response);
        }

        let outcome = if status == StatusCode::NOT_FOUND {
            "not_found"
        } else {
            "error"
        };
        UpstreamMetrics::record(self.service.as_str(), outcome, elapsed);

        let body = response.text().await.unwrap_or_default();
        Err(CompositeError::Upstream {
            service: self.service.as_str().to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> CompositeResult<T> {
        let url = response.url().to_string();
        let bytes = response.bytes().await.map_err(|e| CompositeError::Transport {
            service: self.service.as_str().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CompositeError::decode(format!("{} service ({url})", self.service), e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_urls() {
        let client =
            ResourceClient::new(Client::new(), Service::Pet, "http://pets:80/api/v1/pets/");

        assert_eq!(client.url(""), "http://pets:80/api/v1/pets/");
        assert_eq!(
            client.url(&ResourceClient::item("42")),
            "http://pets:80/api/v1/pets/42/"
        );
        assert_eq!(
            client.url("/breeder/1/waitlist"),
            "http://pets:80/api/v1/pets/breeder/1/waitlist"
        );
    }

    proptest! {
        #[test]
        fn item_urls_have_exactly_one_separator(
            id in "[a-z0-9]{1,8}",
            trailing in proptest::bool::ANY,
        ) {
            let base = if trailing { "http://b/api/breeders/" } else { "http://b/api/breeders" };
            let client = ResourceClient::new(Client::new(), Service::Breeder, base);
            prop_assert_eq!(
                client.url(&ResourceClient::item(&id)),
                format!("http://b/api/breeders/{id}/")
            );
        }
    }
}
