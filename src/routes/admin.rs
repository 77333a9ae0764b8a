use std::convert::Infallible;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{
        Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use axum_valid::Valid;
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::admin::{
        AdminTeamView, QrCodesResponse, RegisterTeamRequest, TournamentStatusResponse,
    },
    error::AppError,
    services::{
        admin_service,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

const ADMIN_PASSCODE_HEADER: &str = "x-admin-passcode";

/// Organiser endpoints, all guarded by the shared admin passcode.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/teams", get(list_teams).post(register_team))
        .route("/admin/teams/{id}/disqualify", post(disqualify_team))
        .route("/admin/tournament", get(tournament_status))
        .route("/admin/tournament/start", post(start_tournament))
        .route("/admin/tournament/reset", post(reset_tournament))
        .route("/admin/qr/{path_id}", get(qr_codes))
        .route("/admin/sse", get(admin_stream))
        .route_layer(middleware::from_fn_with_state(state, require_admin_passcode))
}

/// Register a new team; house and path are assigned by the server.
#[utoipa::path(
    post,
    path = "/admin/teams",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode")),
    request_body = RegisterTeamRequest,
    responses(
        (status = 201, description = "Team registered", body = AdminTeamView),
        (status = 400, description = "Invalid or duplicate team details"),
    )
)]
pub async fn register_team(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterTeamRequest>>,
) -> Result<(StatusCode, Json<AdminTeamView>), AppError> {
    let team = admin_service::register_team(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// List the teams of the active session, credentials included.
#[utoipa::path(
    get,
    path = "/admin/teams",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode")),
    responses((status = 200, description = "Registered teams", body = [AdminTeamView]))
)]
pub async fn list_teams(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AdminTeamView>>, AppError> {
    Ok(Json(admin_service::list_teams(&state).await?))
}

#[utoipa::path(
    post,
    path = "/admin/teams/{id}/disqualify",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode"),
    ("id" = String, Path, description = "Identifier of the team to disqualify")),
    responses(
        (status = 200, description = "Team disqualified", body = AdminTeamView),
        (status = 404, description = "Team not part of the active session"),
    )
)]
pub async fn disqualify_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminTeamView>, AppError> {
    Ok(Json(admin_service::disqualify_team(&state, id).await?))
}

/// Session flags and team counters.
#[utoipa::path(
    get,
    path = "/admin/tournament",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode")),
    responses((status = 200, description = "Tournament status", body = TournamentStatusResponse))
)]
pub async fn tournament_status(
    State(state): State<SharedState>,
) -> Result<Json<TournamentStatusResponse>, AppError> {
    Ok(Json(admin_service::tournament_status(&state).await?))
}

/// Start the race and stamp the global start time.
#[utoipa::path(
    post,
    path = "/admin/tournament/start",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode")),
    responses(
        (status = 200, description = "Tournament started", body = TournamentStatusResponse),
        (status = 409, description = "Tournament already running"),
    )
)]
pub async fn start_tournament(
    State(state): State<SharedState>,
) -> Result<Json<TournamentStatusResponse>, AppError> {
    Ok(Json(admin_service::start_tournament(&state).await?))
}

/// Open a new session; previous teams are kept but no longer listed.
#[utoipa::path(
    post,
    path = "/admin/tournament/reset",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode")),
    responses((status = 200, description = "Tournament reset", body = TournamentStatusResponse))
)]
pub async fn reset_tournament(
    State(state): State<SharedState>,
) -> Result<Json<TournamentStatusResponse>, AppError> {
    Ok(Json(admin_service::reset_tournament(&state).await?))
}

/// Payload text to encode into the QR code of every station of a path.
#[utoipa::path(
    get,
    path = "/admin/qr/{path_id}",
    tag = "admin",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode"),
    ("path_id" = String, Path, description = "Configured path identifier")),
    responses(
        (status = 200, description = "Station payloads", body = QrCodesResponse),
        (status = 404, description = "Unknown path"),
    )
)]
pub async fn qr_codes(
    State(state): State<SharedState>,
    Path(path_id): Path<String>,
) -> Result<Json<QrCodesResponse>, AppError> {
    Ok(Json(admin_service::qr_codes(&state, &path_id)?))
}

#[utoipa::path(
    get,
    path = "/admin/sse",
    tag = "sse",
    params(("X-Admin-Passcode" = String, Header, description = "Shared organiser passcode")),
    responses((status = 200, description = "Admin SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream admin events, registrations with credentials included.
pub async fn admin_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (receiver, handshake) = sse_service::subscribe(&state, StreamKind::Admin);
    info!("New admin SSE connection");
    sse_service::to_sse_stream(receiver, handshake, StreamKind::Admin)
}

async fn require_admin_passcode(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_PASSCODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin passcode header `X-Admin-Passcode`".into())
        })?;

    if provided == state.config().admin_passcode() {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid admin passcode".into()))
    }
}
