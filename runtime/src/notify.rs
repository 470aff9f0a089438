//! Notification Dispatcher: turns a webhook event into an email notification.
//!
//! The webhook's contract is "we received and processed your event". Once the
//! payload has been built, delivery problems (non-200 function status or a
//! failed invocation) degrade the outcome to `partial_success` instead of
//! failing the request, so the sender does not retry.

use crate::client::ResourceClient;
use crate::metrics::NotificationMetrics;
use composite_core::{
    CompositeError, CompositeResult, DeliveryStatus, NotificationEnvelope, NotificationFunction,
    NotificationPayload, RequestContext, WebhookOutcome, WebhookPayload,
};
use serde_json::Value;
use std::sync::Arc;

/// Gathers breeder, pet and customer records and invokes the notification function.
#[derive(Clone)]
pub struct NotificationDispatcher {
    breeders: ResourceClient,
    pets: ResourceClient,
    customers: ResourceClient,
    function: Arc<dyn NotificationFunction>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("breeders", &self.breeders)
            .field("pets", &self.pets)
            .field("customers", &self.customers)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        breeders: ResourceClient,
        pets: ResourceClient,
        customers: ResourceClient,
        function: Arc<dyn NotificationFunction>,
    ) -> Self {
        Self {
            breeders,
            pets,
            customers,
            function,
        }
    }

    /// Handle one webhook delivery.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::Validation`] for missing webhook keys (before any
    ///   upstream call) or missing record fields
    /// - [`CompositeError::NotFound`] when a referenced record does not exist
    /// - other upstream failures while fetching records
    pub async fn dispatch(
        &self,
        payload: WebhookPayload,
        ctx: &RequestContext,
    ) -> CompositeResult<WebhookOutcome> {
        let event = payload.validate()?;

        let (breeder, pet, customer) = tokio::try_join!(
            fetch(&self.breeders, "Breeder", &event.breeder_id, ctx),
            fetch(&self.pets, "Pet", &event.pet_id, ctx),
            fetch(&self.customers, "Customer", &event.consumer_id, ctx),
        )?;

        let notification = build_payload(&breeder, &pet, &customer, &event.pet_id)?;
        let envelope = NotificationEnvelope::wrap(&notification)?;

        let outcome = match self.function.invoke(&envelope, ctx).await {
            Ok(response) if response.status == 200 => WebhookOutcome {
                status: DeliveryStatus::Success,
                message: "Notification sent".to_string(),
                notification,
                function_status: Some(response.status),
            },
            Ok(response) => {
                tracing::warn!(
                    function_status = response.status,
                    body = %response.body,
                    pet_id = %event.pet_id,
                    "Notification function reported failure"
                );
                WebhookOutcome {
                    status: DeliveryStatus::PartialSuccess,
                    message: format!(
                        "Event processed but notification failed with status {}",
                        response.status
                    ),
                    notification,
                    function_status: Some(response.status),
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    pet_id = %event.pet_id,
                    "Notification function unreachable"
                );
                WebhookOutcome {
                    status: DeliveryStatus::PartialSuccess,
                    message: format!(
                        "Event processed but notification could not be delivered: {e}"
                    ),
                    notification,
                    function_status: None,
                }
            }
        };

        NotificationMetrics::record(match outcome.status {
            DeliveryStatus::Success => "success",
            DeliveryStatus::PartialSuccess => "partial_success",
        });
        Ok(outcome)
    }
}

async fn fetch(
    client: &ResourceClient,
    resource: &'static str,
    id: &str,
    ctx: &RequestContext,
) -> CompositeResult<Value> {
    client
        .get_optional::<Value>(&ResourceClient::item(id), ctx)
        .await?
        .ok_or_else(|| CompositeError::not_found(resource, id))
}

fn build_payload(
    breeder: &Value,
    pet: &Value,
    customer: &Value,
    pet_id: &str,
) -> CompositeResult<NotificationPayload> {
    let mut missing = Vec::new();
    let mut require = |record: &Value, field: &str, key: &'static str| {
        match record.get(field).and_then(Value::as_str).map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                missing.push(key);
                String::new()
            }
        }
    };

    let payload = NotificationPayload {
        breeder_email: require(breeder, "email", "breeder_email"),
        customer_name: require(customer, "name", "customer_name"),
        customer_email: require(customer, "email", "customer_email"),
        pet_name: require(pet, "name", "pet_name"),
        pet_id: pet_id.to_string(),
    };

    if missing.is_empty() {
        Ok(payload)
    } else {
        Err(CompositeError::Validation(format!(
            "Missing required keys: {}",
            missing.join(", ")
        )))
    }
}
