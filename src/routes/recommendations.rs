use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResponse},
    routes::AppState,
};

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let exclusions = request.exclusion_set();

    tracing::info!(
        request_id = %request_id,
        message_chars = request.message.len(),
        excluded = exclusions.len(),
        "Processing recommendation request"
    );

    let response = state
        .recommender
        .recommend(&request.message, &exclusions)
        .await?;

    tracing::info!(
        request_id = %request_id,
        returned = response.books.len(),
        total = response.total,
        has_more = response.has_more,
        "Recommendation completed"
    );

    Ok(Json(response))
}
