use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    error::Result,
    middleware_layer::auth::AuthUser,
    models::booth::BoothSummary,
    services::booths as booths_service,
    state::AppState,
};

#[derive(Deserialize, Debug)]
pub struct UpdatePaperRequest {
    pub loaded_paper: i32,
}

/// Profile read for the authenticated booth.
#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let booth = booths_service::profile(&state, auth_user.id).await?;
    Ok((StatusCode::OK, Json(BoothSummary::from(&booth))).into_response())
}

/// Self-service paper-count update after a refill.
#[axum::debug_handler]
pub async fn update_paper(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdatePaperRequest>,
) -> Result<Response> {
    let booth =
        booths_service::update_loaded_paper(&state, auth_user.id, payload.loaded_paper).await?;

    tracing::info!(
        "📄 Booth {} paper count set to {}/{}",
        booth.id,
        booth.loaded_paper,
        booth.paper_capacity
    );

    Ok((StatusCode::OK, Json(BoothSummary::from(&booth))).into_response())
}
