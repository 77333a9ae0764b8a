use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quest Trail Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::admin::admin_stream,
        crate::routes::admin::register_team,
        crate::routes::admin::list_teams,
        crate::routes::admin::disqualify_team,
        crate::routes::admin::tournament_status,
        crate::routes::admin::start_tournament,
        crate::routes::admin::reset_tournament,
        crate::routes::admin::qr_codes,
        crate::routes::team::login,
        crate::routes::team::dashboard,
        crate::routes::team::scan,
        crate::routes::team::report_integrity,
        crate::routes::team::gatekeeper,
        crate::routes::public::leaderboard,
        crate::routes::public::tournament,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::admin::RegisterTeamRequest,
            crate::dto::admin::AdminTeamView,
            crate::dto::admin::TournamentStatusResponse,
            crate::dto::admin::QrCodeEntry,
            crate::dto::admin::QrCodesResponse,
            crate::dto::team::TeamStatusDto,
            crate::dto::team::TeamView,
            crate::dto::team::LoginRequest,
            crate::dto::team::TeamSession,
            crate::dto::team::DashboardResponse,
            crate::dto::team::ScanRequest,
            crate::dto::team::ScanOutcomeDto,
            crate::dto::team::ScanResponse,
            crate::dto::team::IntegrityEventDto,
            crate::dto::team::IntegrityRequest,
            crate::dto::team::IntegrityVerdictDto,
            crate::dto::team::IntegrityResponse,
            crate::dto::team::GatekeeperRequest,
            crate::dto::team::GateOutcomeDto,
            crate::dto::team::GatekeeperResponse,
            crate::dto::public::PhaseDto,
            crate::dto::public::LeaderboardRow,
            crate::dto::public::LeaderboardResponse,
            crate::dto::public::PublicTournamentResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::TeamRegisteredEvent,
            crate::dto::sse::TeamProgressedEvent,
            crate::dto::sse::TeamDisqualifiedEvent,
            crate::dto::sse::LifecycleEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "admin", description = "Organiser operations (X-Admin-Passcode)"),
        (name = "team", description = "Student dashboard operations (X-Team-Passcode)"),
        (name = "public", description = "Leaderboard and tournament status"),
    )
)]
pub struct ApiDoc;
