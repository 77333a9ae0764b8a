//! Session metadata helpers shared by the admin, team and public services.

use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::{
    dao::{
        hunt_store::HuntStore,
        storage::{StorageError, Versioned},
    },
    dto::{
        format_system_time,
        public::{LeaderboardResponse, LeaderboardRow},
    },
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        hunt::{Team, TournamentMetadata},
        leaderboard,
    },
};

/// Read the metadata document, creating a fresh unstarted session when none exists yet.
pub async fn load_or_init_metadata(
    store: &dyn HuntStore,
) -> Result<Versioned<TournamentMetadata>, ServiceError> {
    if let Some(existing) = store.load_metadata().await? {
        return Ok(Versioned {
            value: existing.value.into(),
            revision: existing.revision,
        });
    }

    let fresh = TournamentMetadata::fresh(SystemTime::now());
    match store.save_metadata(fresh.clone().into(), None).await {
        Ok(revision) => {
            info!(
                tournament_id = %fresh.active_tournament_id,
                "initialised tournament metadata"
            );
            Ok(Versioned {
                value: fresh,
                revision,
            })
        }
        Err(StorageError::Duplicate { .. }) => {
            debug!("metadata created concurrently; reloading");
            let existing = store
                .load_metadata()
                .await?
                .ok_or_else(|| ServiceError::Sync("metadata vanished after creation".into()))?;
            Ok(Versioned {
                value: existing.value.into(),
                revision: existing.revision,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Teams registered in the session identified by `metadata`.
pub async fn active_teams(
    store: &dyn HuntStore,
    metadata: &TournamentMetadata,
) -> Result<Vec<Team>, ServiceError> {
    let teams = store.list_teams(metadata.active_tournament_id).await?;
    Ok(teams.into_iter().map(Team::from).collect())
}

/// Rank `teams` and project them into the leaderboard payload.
pub fn build_leaderboard(
    metadata: &TournamentMetadata,
    teams: &[Team],
    total_stages: u32,
    now: SystemTime,
) -> LeaderboardResponse {
    let rows = leaderboard::rank(teams, metadata.start_time, now)
        .iter()
        .map(LeaderboardRow::from)
        .collect();
    LeaderboardResponse {
        tournament_id: metadata.active_tournament_id,
        is_started: metadata.is_started,
        start_time: metadata.start_time.map(format_system_time),
        server_time: format_system_time(now),
        total_stages,
        rows,
    }
}

/// Current leaderboard of the active session.
pub async fn current_leaderboard(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    let store = state.require_store().await?;
    let metadata = load_or_init_metadata(store.as_ref()).await?.value;
    let teams = active_teams(store.as_ref(), &metadata).await?;
    Ok(build_leaderboard(
        &metadata,
        &teams,
        state.config().total_stages(),
        SystemTime::now(),
    ))
}

/// Push a fresh leaderboard to both SSE hubs. Failures are logged, never surfaced.
pub async fn publish_leaderboard(state: &SharedState) {
    match current_leaderboard(state).await {
        Ok(board) => sse_events::broadcast_leaderboard(state, &board),
        Err(err) => warn!(error = %err, "failed to refresh leaderboard broadcast"),
    }
}

/// Align the lifecycle machine with the persisted metadata.
pub async fn sync_lifecycle(state: &SharedState) -> Result<TournamentMetadata, ServiceError> {
    let store = state.require_store().await?;
    let metadata = load_or_init_metadata(store.as_ref()).await?.value;
    state.reseed_lifecycle(metadata.is_started).await;
    Ok(metadata)
}
