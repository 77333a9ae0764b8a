//! Business logic powering the admin REST routes: registration with balanced allocation,
//! session lifecycle, printable station codes and manual disqualification.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::transaction::{MAX_TRANSACTION_ATTEMPTS, TxStep, run_team_transaction},
    dto::{
        admin::{
            AdminTeamView, QrCodeEntry, QrCodesResponse, RegisterTeamRequest,
            TournamentStatusResponse,
        },
        format_system_time,
    },
    error::ServiceError,
    services::{sse_events, tournament_service},
    state::{
        SharedState,
        allocation::allocate,
        hunt::{QrPayload, Team, TournamentMetadata},
        integrity,
        state_machine::{TournamentEvent, TournamentPhase},
        transitions::run_transition_with_broadcast,
    },
};

/// Register a team in the active session, balancing houses and paths.
pub async fn register_team(
    state: &SharedState,
    request: RegisterTeamRequest,
) -> Result<AdminTeamView, ServiceError> {
    let name = request.name.trim().to_string();
    let leader = request.leader.trim().to_string();
    let passcode = request.passcode.trim().to_string();
    let round2_secret = request
        .round2_secret
        .map(|secret| secret.trim().to_string())
        .filter(|secret| !secret.is_empty());

    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;
    let existing = tournament_service::active_teams(store.as_ref(), &metadata).await?;

    if existing
        .iter()
        .any(|team| team.name.to_lowercase() == name.to_lowercase())
    {
        return Err(ServiceError::InvalidInput(format!(
            "team name `{name}` is already taken"
        )));
    }

    let config = state.config();
    let allocation = allocate(
        config.houses().iter().map(String::as_str),
        config.path_ids(),
        &existing,
        &mut rand::rng(),
    )
    .ok_or_else(|| ServiceError::InvalidState("no houses or paths configured".into()))?;

    let team = Team::register(
        metadata.active_tournament_id,
        name,
        leader,
        passcode,
        round2_secret,
        allocation.house,
        allocation.path,
        SystemTime::now(),
    );
    store.insert_team(team.clone().into()).await?;
    info!(
        team_id = %team.id,
        name = %team.name,
        house = %team.house,
        path = %team.path,
        "team registered"
    );

    sse_events::broadcast_team_registered(state, &team);
    tournament_service::publish_leaderboard(state).await;
    Ok(AdminTeamView::from(&team))
}

/// Teams of the active session, credentials included.
pub async fn list_teams(state: &SharedState) -> Result<Vec<AdminTeamView>, ServiceError> {
    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;
    let teams = tournament_service::active_teams(store.as_ref(), &metadata).await?;
    Ok(teams.iter().map(AdminTeamView::from).collect())
}

pub async fn tournament_status(
    state: &SharedState,
) -> Result<TournamentStatusResponse, ServiceError> {
    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;
    let teams = tournament_service::active_teams(store.as_ref(), &metadata).await?;

    Ok(TournamentStatusResponse {
        phase: TournamentPhase::from_started(metadata.is_started).into(),
        is_started: metadata.is_started,
        start_time: metadata.start_time.map(format_system_time),
        active_tournament_id: metadata.active_tournament_id,
        team_count: teams.len(),
        finished_count: teams.iter().filter(|team| team.is_finished()).count(),
        disqualified_count: teams.iter().filter(|team| team.disqualified).count(),
        server_time: format_system_time(SystemTime::now()),
    })
}

/// Open the race: flag the session as started and stamp the global start time.
pub async fn start_tournament(
    state: &SharedState,
) -> Result<TournamentStatusResponse, ServiceError> {
    // another instance may have moved the session since our last sync
    tournament_service::sync_lifecycle(state).await?;
    run_transition_with_broadcast(state, TournamentEvent::Start, move || async move {
        let store = state.require_store().await?;
        let current = tournament_service::load_or_init_metadata(store.as_ref()).await?;
        if current.value.is_started {
            return Err(ServiceError::InvalidState(
                "tournament is already running".into(),
            ));
        }

        let now = SystemTime::now();
        let metadata = TournamentMetadata {
            is_started: true,
            start_time: Some(now),
            updated_at: now,
            ..current.value
        };
        store
            .save_metadata(metadata.clone().into(), Some(current.revision))
            .await?;
        info!(tournament_id = %metadata.active_tournament_id, "tournament started");
        Ok(metadata)
    })
    .await?;

    tournament_service::publish_leaderboard(state).await;
    tournament_status(state).await
}

/// Begin a new session. Previous teams stay stored but drop out of every view.
pub async fn reset_tournament(
    state: &SharedState,
) -> Result<TournamentStatusResponse, ServiceError> {
    tournament_service::sync_lifecycle(state).await?;
    run_transition_with_broadcast(state, TournamentEvent::Reset, move || async move {
        let store = state.require_store().await?;
        let current = tournament_service::load_or_init_metadata(store.as_ref()).await?;
        let metadata = TournamentMetadata::fresh(SystemTime::now());
        store
            .save_metadata(metadata.clone().into(), Some(current.revision))
            .await?;
        info!(
            previous = %current.value.active_tournament_id,
            tournament_id = %metadata.active_tournament_id,
            "tournament reset"
        );
        Ok(metadata)
    })
    .await?;

    state.throttle().clear();
    tournament_service::publish_leaderboard(state).await;
    tournament_status(state).await
}

/// Payload text and label for every station of `path_id`.
pub fn qr_codes(state: &SharedState, path_id: &str) -> Result<QrCodesResponse, ServiceError> {
    let config = state.config();
    if !config.has_path(path_id) {
        return Err(ServiceError::NotFound(format!("path `{path_id}` not found")));
    }

    let codes = (1..=config.total_stages())
        .map(|stage| {
            let payload = QrPayload {
                path_id: path_id.to_string(),
                stage,
            };
            QrCodeEntry {
                stage,
                label: format!("{} / stage {stage}", path_id.to_uppercase()),
                payload: payload.encode(),
                clue: config.clue(path_id, stage).map(str::to_string),
            }
        })
        .collect();

    Ok(QrCodesResponse {
        path_id: path_id.to_string(),
        codes,
    })
}

/// Raise the anti-cheat latch on a team of the active session.
pub async fn disqualify_team(state: &SharedState, id: Uuid) -> Result<AdminTeamView, ServiceError> {
    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;

    let outcome = run_team_transaction(
        store.as_ref(),
        id,
        MAX_TRANSACTION_ATTEMPTS,
        |entity| {
            let mut team = Team::from(entity);
            if team.tournament_id != metadata.active_tournament_id {
                return Err(ServiceError::NotFound(format!("team `{id}` not found")));
            }
            if integrity::disqualify(&mut team, SystemTime::now()) {
                Ok(TxStep::Commit(team.into(), ()))
            } else {
                Ok(TxStep::Skip(()))
            }
        },
    )
    .await?;

    let team = Team::from(outcome.team);
    if outcome.committed {
        info!(team_id = %team.id, name = %team.name, "team disqualified by organiser");
        sse_events::broadcast_team_disqualified(state, &team);
        tournament_service::publish_leaderboard(state).await;
    } else {
        debug!(team_id = %team.id, "team already disqualified");
    }
    Ok(AdminTeamView::from(&team))
}
