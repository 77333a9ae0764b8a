use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::public::{LeaderboardResponse, PublicTournamentResponse},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Unauthenticated read-only endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/public/leaderboard", get(leaderboard))
        .route("/public/tournament", get(tournament))
}

/// Ranked teams ordered by stage, score and elapsed time.
#[utoipa::path(
    get,
    path = "/public/leaderboard",
    tag = "public",
    responses(
        (status = 200, description = "Current leaderboard", body = LeaderboardResponse),
        (status = 503, description = "Storage unavailable"),
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(public_service::leaderboard(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/tournament",
    tag = "public",
    responses((status = 200, description = "Tournament flags and server time", body = PublicTournamentResponse))
)]
pub async fn tournament(
    State(state): State<SharedState>,
) -> Result<Json<PublicTournamentResponse>, AppError> {
    Ok(Json(public_service::tournament(&state).await?))
}
