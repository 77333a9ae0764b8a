//! Read-only projections for projectors and spectators.

use std::time::SystemTime;

use crate::{
    dto::{
        format_system_time,
        public::{LeaderboardResponse, PublicTournamentResponse},
    },
    error::ServiceError,
    services::tournament_service,
    state::{SharedState, state_machine::TournamentPhase},
};

/// Ranked teams of the active session.
pub async fn leaderboard(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    tournament_service::current_leaderboard(state).await
}

/// Public tournament flags together with the server clock.
pub async fn tournament(state: &SharedState) -> Result<PublicTournamentResponse, ServiceError> {
    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;

    Ok(PublicTournamentResponse {
        phase: TournamentPhase::from_started(metadata.is_started).into(),
        is_started: metadata.is_started,
        start_time: metadata.start_time.map(format_system_time),
        server_time: format_system_time(SystemTime::now()),
        total_stages: state.config().total_stages(),
        degraded: state.is_degraded(),
    })
}
