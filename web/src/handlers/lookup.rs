//! Lookups served through the asynchronous bridges.

use crate::WebResult;
use crate::extractors::Context;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use composite_core::{Breeder, Customer};

/// `GET /composites/breeders/id/{id}/`
///
/// Publishes a lookup request and waits for the correlated reply.
///
/// # Errors
///
/// 504 when no reply arrives in time, 404 when the reply says the breeder
/// does not exist, 500 for any other reply error.
pub async fn breeder_by_id(
    State(state): State<AppState>,
    Context(ctx): Context,
    Path(breeder_id): Path<String>,
) -> WebResult<Json<Breeder>> {
    Ok(Json(state.engine.breeder_via_pubsub(&breeder_id, &ctx).await?))
}

/// `GET /composites/customers/id/{id}/`
///
/// Runs the customer lookup workflow and polls it to completion.
///
/// # Errors
///
/// 408 when the execution does not finish in time, 404 when the workflow
/// reports code 404, 500 when the execution fails.
pub async fn customer_by_id(
    State(state): State<AppState>,
    Context(ctx): Context,
    Path(customer_id): Path<String>,
) -> WebResult<Json<Customer>> {
    Ok(Json(
        state
            .engine
            .customer_via_workflow(&customer_id, &ctx)
            .await?,
    ))
}
