//! `GET /composites/graph/breeders/{breeder_id}/`

use crate::WebResult;
use crate::extractors::Context;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use composite_core::BreederGraph;
use serde::Serialize;

/// `{"data": {"breederPetsWithWaitlist": {...}}}`
#[derive(Debug, Serialize)]
pub struct GraphResponse {
    /// Query results
    pub data: GraphData,
}

/// Named query results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    /// Breeder with its pets and their waitlists
    pub breeder_pets_with_waitlist: BreederGraph,
}

/// Resolve the breeder → pets → waitlist graph.
///
/// # Errors
///
/// 404 for an unknown breeder; 500 when an upstream answer is malformed.
pub async fn breeder_pets_with_waitlist(
    State(state): State<AppState>,
    Context(ctx): Context,
    Path(breeder_id): Path<String>,
) -> WebResult<Json<GraphResponse>> {
    let graph = state
        .query
        .breeder_pets_with_waitlist(&breeder_id, &ctx)
        .await?;
    Ok(Json(GraphResponse {
        data: GraphData {
            breeder_pets_with_waitlist: graph,
        },
    }))
}
