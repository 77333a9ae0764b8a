use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        admin::AdminTeamView,
        format_system_time,
        public::LeaderboardResponse,
        sse::{
            LifecycleEvent, ServerEvent, SystemStatus, TeamDisqualifiedEvent,
            TeamProgressedEvent, TeamRegisteredEvent,
        },
        team::TeamView,
    },
    state::{
        SharedState,
        hunt::{Team, TournamentMetadata},
        state_machine::{TournamentEvent, TournamentPhase},
    },
};

pub const EVENT_TEAM_REGISTERED: &str = "team.registered";
pub const EVENT_TEAM_PROGRESSED: &str = "team.progressed";
pub const EVENT_TEAM_DISQUALIFIED: &str = "team.disqualified";
pub const EVENT_TEAM_GATE_UNLOCKED: &str = "team.gate_unlocked";
pub const EVENT_LEADERBOARD: &str = "leaderboard";
pub const EVENT_TOURNAMENT_STARTED: &str = "tournament.started";
pub const EVENT_TOURNAMENT_RESET: &str = "tournament.reset";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// New team: full record to admins, credential-free view to the public stream.
pub fn broadcast_team_registered(state: &SharedState, team: &Team) {
    send_admin_event(
        state,
        EVENT_TEAM_REGISTERED,
        &TeamRegisteredEvent {
            team: AdminTeamView::from(team),
        },
    );
    send_public_event(
        state,
        EVENT_TEAM_PROGRESSED,
        &TeamProgressedEvent {
            team: TeamView::from(team),
            outcome: "registered".into(),
        },
    );
}

/// A scan changed the team (advance, finish or penalty).
pub fn broadcast_team_progressed(state: &SharedState, team: &Team, outcome: &str) {
    let payload = TeamProgressedEvent {
        team: TeamView::from(team),
        outcome: outcome.to_string(),
    };
    send_public_event(state, EVENT_TEAM_PROGRESSED, &payload);
    send_admin_event(state, EVENT_TEAM_PROGRESSED, &payload);
}

pub fn broadcast_team_disqualified(state: &SharedState, team: &Team) {
    let payload = TeamDisqualifiedEvent {
        team_id: team.id,
        name: team.name.clone(),
    };
    send_public_event(state, EVENT_TEAM_DISQUALIFIED, &payload);
    send_admin_event(state, EVENT_TEAM_DISQUALIFIED, &payload);
}

/// A finished team gave the round-two secret at the gate.
pub fn broadcast_gate_unlocked(state: &SharedState, team: &Team) {
    let payload = TeamProgressedEvent {
        team: TeamView::from(team),
        outcome: "gate_unlocked".into(),
    };
    send_public_event(state, EVENT_TEAM_GATE_UNLOCKED, &payload);
    send_admin_event(state, EVENT_TEAM_GATE_UNLOCKED, &payload);
}

pub fn broadcast_leaderboard(state: &SharedState, leaderboard: &LeaderboardResponse) {
    send_public_event(state, EVENT_LEADERBOARD, leaderboard);
    send_admin_event(state, EVENT_LEADERBOARD, leaderboard);
}

/// Lifecycle change after `start` or `reset`.
pub fn broadcast_lifecycle(
    state: &SharedState,
    event: TournamentEvent,
    phase: TournamentPhase,
    metadata: &TournamentMetadata,
) {
    let name = match event {
        TournamentEvent::Start => EVENT_TOURNAMENT_STARTED,
        TournamentEvent::Reset => EVENT_TOURNAMENT_RESET,
    };
    let payload = LifecycleEvent {
        phase: phase.into(),
        is_started: metadata.is_started,
        start_time: metadata.start_time.map(format_system_time),
        active_tournament_id: metadata.active_tournament_id,
    };
    send_public_event(state, name, &payload);
    send_admin_event(state, name, &payload);
}

pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_admin_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_admin_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.admin_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize admin SSE payload"),
    }
}
