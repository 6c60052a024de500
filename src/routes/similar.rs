use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationResponse, SimilarBooksRequest},
    routes::AppState,
    services::similar::similar_books,
};

/// Handler for the similar-books endpoint
pub async fn similar(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SimilarBooksRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        book_id = %request.book_id,
        "Processing similar-books request"
    );

    let response = similar_books(&state.catalog, &request.book_id).await?;

    Ok(Json(response))
}
