use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::team::{
        DashboardResponse, GatekeeperRequest, GatekeeperResponse, IntegrityRequest,
        IntegrityResponse, LoginRequest, ScanRequest, ScanResponse, TeamSession,
    },
    error::AppError,
    services::team_service,
    state::SharedState,
};

const TEAM_PASSCODE_HEADER: &str = "x-team-passcode";

/// Student dashboard endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/team/login", post(login))
        .route("/team/{id}/dashboard", get(dashboard))
        .route("/team/{id}/scan", post(scan))
        .route("/team/{id}/integrity", post(report_integrity))
        .route("/team/{id}/gatekeeper", post(gatekeeper))
}

fn team_passcode(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(TEAM_PASSCODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing team passcode header `X-Team-Passcode`".into()))
}

/// Log a team in with its name and passcode.
#[utoipa::path(
    post,
    path = "/team/login",
    tag = "team",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session details", body = TeamSession),
        (status = 401, description = "Unknown team or wrong passcode"),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<LoginRequest>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(team_service::login(&state, payload).await?))
}

/// Progress, timer, next clue and secret fragments of a team.
#[utoipa::path(
    get,
    path = "/team/{id}/dashboard",
    tag = "team",
    params(("X-Team-Passcode" = String, Header, description = "Team passcode"),
    ("id" = String, Path, description = "Team identifier")),
    responses(
        (status = 200, description = "Dashboard snapshot", body = DashboardResponse),
        (status = 404, description = "Team not part of the active session"),
    )
)]
pub async fn dashboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let passcode = team_passcode(&headers)?;
    Ok(Json(team_service::dashboard(&state, id, passcode).await?))
}

/// Submit the text decoded from a station QR code.
///
/// Rule violations are reported in the body with a `rejected` outcome; only transport,
/// authentication and storage problems produce error statuses.
#[utoipa::path(
    post,
    path = "/team/{id}/scan",
    tag = "team",
    params(("X-Team-Passcode" = String, Header, description = "Team passcode"),
    ("id" = String, Path, description = "Team identifier")),
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan outcome", body = ScanResponse),
        (status = 409, description = "Team kept changing concurrently; resync and retry"),
    )
)]
pub async fn scan(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<ScanRequest>>,
) -> Result<Json<ScanResponse>, AppError> {
    let passcode = team_passcode(&headers)?;
    Ok(Json(team_service::scan(&state, id, passcode, payload).await?))
}

/// Report a tab switch or back navigation.
#[utoipa::path(
    post,
    path = "/team/{id}/integrity",
    tag = "team",
    params(("X-Team-Passcode" = String, Header, description = "Team passcode"),
    ("id" = String, Path, description = "Team identifier")),
    request_body = IntegrityRequest,
    responses((status = 200, description = "Anti-cheat verdict", body = IntegrityResponse))
)]
pub async fn report_integrity(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<IntegrityRequest>,
) -> Result<Json<IntegrityResponse>, AppError> {
    let passcode = team_passcode(&headers)?;
    Ok(Json(
        team_service::report_integrity(&state, id, passcode, payload).await?,
    ))
}

/// Give the round-two secret at the final gate.
#[utoipa::path(
    post,
    path = "/team/{id}/gatekeeper",
    tag = "team",
    params(("X-Team-Passcode" = String, Header, description = "Team passcode"),
    ("id" = String, Path, description = "Team identifier")),
    request_body = GatekeeperRequest,
    responses(
        (status = 200, description = "Gate outcome; refusals carry a reason", body = GatekeeperResponse),
        (status = 404, description = "Team not part of the active session"),
    )
)]
pub async fn gatekeeper(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<GatekeeperRequest>>,
) -> Result<Json<GatekeeperResponse>, AppError> {
    let passcode = team_passcode(&headers)?;
    Ok(Json(
        team_service::gatekeeper(&state, id, passcode, payload).await?,
    ))
}
