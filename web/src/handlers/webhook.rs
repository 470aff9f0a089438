//! `POST /composites/webhook`

use crate::WebResult;
use crate::extractors::{ApiJson, Context};
use crate::state::AppState;
use axum::{Json, extract::State};
use composite_core::{WebhookOutcome, WebhookPayload};

/// Turn a `{breeder_id, pet_id, consumer_id}` event into an email notification.
///
/// A failed notification still answers 200 with `status: "partial_success"`.
///
/// # Errors
///
/// 400 when a key is missing (before any upstream call); 404 when a referenced
/// record does not exist.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Context(ctx): Context,
    ApiJson(payload): ApiJson<WebhookPayload>,
) -> WebResult<Json<WebhookOutcome>> {
    Ok(Json(state.notifications.dispatch(payload, &ctx).await?))
}
