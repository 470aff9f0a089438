//! Composite CRUD: create, list, get and update breeders with their pets.

use crate::WebResult;
use crate::extractors::{ApiJson, ApiQuery, Context};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{
        StatusCode,
        header::{LINK, LOCATION},
    },
    response::{IntoResponse, Response},
};
use composite_core::{Breeder, Composite, CompositeFilter, CompositeIn, CompositeUpdate};

/// `POST /composites/`
///
/// Creates the breeder, then each pet with the new breeder's id.
///
/// # Response
///
/// `201 Created` with `Location` and `Link` headers and the composite body.
///
/// # Errors
///
/// - 400 for malformed input
/// - 404 when the breeder or pet service is not present
/// - the upstream status when a call fails, with a partial-creation report in
///   `details` once the breeder exists
pub async fn create_composite(
    State(state): State<AppState>,
    Context(ctx): Context,
    ApiJson(input): ApiJson<CompositeIn>,
) -> WebResult<Response> {
    let created = state.engine.create_composite(input, &ctx).await?;
    Ok((
        StatusCode::CREATED,
        [(LOCATION, created.location), (LINK, created.link_header)],
        Json(created.body),
    )
        .into_response())
}

/// `GET /composites/?breeder_limit&breeder_offset&breeder_city&pet_limit&pet_offset&type`
///
/// # Errors
///
/// 400 for invalid filters; 500 if either list call fails.
pub async fn list_composites(
    State(state): State<AppState>,
    Context(ctx): Context,
    ApiQuery(filter): ApiQuery<CompositeFilter>,
) -> WebResult<Json<Composite>> {
    Ok(Json(state.engine.list_composites(&filter, &ctx).await?))
}

/// `GET /composites/{id}/`
///
/// # Errors
///
/// 404 with a breeder-specific message when the breeder does not exist.
pub async fn get_composite(
    State(state): State<AppState>,
    Context(ctx): Context,
    Path(breeder_id): Path<String>,
) -> WebResult<Json<Breeder>> {
    Ok(Json(state.engine.get_composite(&breeder_id, &ctx).await?))
}

/// `PUT /composites/both/{breeder_id}/{pet_id}/`
///
/// # Errors
///
/// 404 naming the missing resource; the upstream status when an update fails.
pub async fn update_both(
    State(state): State<AppState>,
    Context(ctx): Context,
    Path((breeder_id, pet_id)): Path<(String, String)>,
    ApiJson(update): ApiJson<CompositeUpdate>,
) -> WebResult<Json<Composite>> {
    Ok(Json(
        state
            .engine
            .update_both(&breeder_id, &pet_id, &update, &ctx)
            .await?,
    ))
}
