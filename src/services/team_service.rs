//! Operations behind the student dashboard: login, dashboard snapshot, scan-to-progress and
//! the anti-cheat reports.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::FALLBACK_CLUE,
    dao::{
        hunt_store::HuntStore,
        transaction::{MAX_TRANSACTION_ATTEMPTS, TxStep, run_team_transaction},
    },
    dto::{
        format_system_time,
        team::{
            DashboardResponse, GatekeeperRequest, GatekeeperResponse, IntegrityRequest,
            IntegrityResponse, LoginRequest, ScanOutcomeDto, ScanRequest, ScanResponse,
            TeamSession, TeamView,
        },
    },
    error::ServiceError,
    services::{sse_events, tournament_service},
    state::{
        SharedState,
        gatekeeper::{GateVerdict, evaluate_gate},
        hunt::{QrPayload, Team, TournamentMetadata},
        integrity::{IntegrityEvent, IntegrityVerdict, evaluate_integrity},
        leaderboard::{elapsed, format_elapsed},
        progression::{
            ScanDecision, ScanRejection, apply_decision, evaluate_scan, rejection_message,
        },
    },
};

/// Resolve the team by name within the active session and check its passcode.
pub async fn login(state: &SharedState, request: LoginRequest) -> Result<TeamSession, ServiceError> {
    let name = request.name.trim();
    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;
    let teams = tournament_service::active_teams(store.as_ref(), &metadata).await?;

    let team = teams
        .iter()
        .find(|team| team.name.eq_ignore_ascii_case(name) && team.passcode == request.passcode.trim())
        .ok_or_else(|| ServiceError::Unauthorized("invalid team name or passcode".into()))?;

    info!(team_id = %team.id, name = %team.name, "team logged in");
    Ok(TeamSession::from(team))
}

/// Load a team of the active session and verify the passcode presented by the dashboard.
async fn authorize(
    state: &SharedState,
    team_id: Uuid,
    passcode: &str,
) -> Result<(Arc<dyn HuntStore>, TournamentMetadata, Team), ServiceError> {
    let store = state.require_store().await?;
    let metadata = tournament_service::load_or_init_metadata(store.as_ref())
        .await?
        .value;

    let team = store
        .find_team(team_id)
        .await?
        .map(|versioned| Team::from(versioned.value))
        .filter(|team| team.tournament_id == metadata.active_tournament_id)
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

    if team.passcode != passcode {
        return Err(ServiceError::Unauthorized("invalid team passcode".into()));
    }
    Ok((store, metadata, team))
}

/// Everything the dashboard renders: progress, timer, next clue and secret fragments.
pub async fn dashboard(
    state: &SharedState,
    team_id: Uuid,
    passcode: &str,
) -> Result<DashboardResponse, ServiceError> {
    let (_store, metadata, team) = authorize(state, team_id, passcode).await?;
    let config = state.config();
    let now = SystemTime::now();
    let elapsed = elapsed(&team, metadata.start_time, now);

    let current_clue = if metadata.is_started && !team.is_finished() {
        config.clue(&team.path, team.target_stage())
    } else {
        None
    }
    .unwrap_or(FALLBACK_CLUE)
    .to_string();

    Ok(DashboardResponse {
        team: TeamView::from(&team),
        total_stages: config.total_stages(),
        tournament_started: metadata.is_started,
        start_time: metadata.start_time.map(format_system_time),
        server_time: format_system_time(now),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        elapsed: format_elapsed(elapsed),
        current_clue,
        secret_fragments: team.secret_fragments(),
    })
}

/// Response for scans refused before reaching the transaction.
fn rejected(reason: ScanRejection, team: &Team) -> ScanResponse {
    ScanResponse {
        outcome: ScanOutcomeDto::Rejected,
        reason: Some(reason.code().to_string()),
        message: rejection_message(reason, team, None),
        team: TeamView::from(team),
    }
}

/// Submit a decoded QR code for the team.
///
/// The decision is taken inside the optimistic team transaction, so two concurrent scans
/// of the same station advance the team once: the second re-evaluates against the
/// advanced record and is rejected as already completed.
pub async fn scan(
    state: &SharedState,
    team_id: Uuid,
    passcode: &str,
    request: ScanRequest,
) -> Result<ScanResponse, ServiceError> {
    let (store, metadata, team) = authorize(state, team_id, passcode).await?;

    let _permit = match state.throttle().try_acquire(team_id) {
        Ok(permit) => permit,
        Err(reason) => {
            debug!(team_id = %team_id, reason = reason.code(), "scan throttled");
            return Ok(rejected(reason, &team));
        }
    };

    let payload = match QrPayload::parse(&request.raw) {
        Ok(payload) => payload,
        Err(err) => {
            debug!(team_id = %team_id, error = %err, "unreadable QR payload");
            return Ok(rejected(ScanRejection::InvalidPayload, &team));
        }
    };

    let config = state.config();
    let total_stages = config.total_stages();
    let rules = config.scoring();
    // Retries re-read the team but keep the session flags read above. A reset landing
    // mid-scan moves the team out of the active session, so the stale flag is harmless.
    let outcome = run_team_transaction(
        store.as_ref(),
        team_id,
        MAX_TRANSACTION_ATTEMPTS,
        |entity| {
            let mut team = Team::from(entity);
            let decision = evaluate_scan(
                &team,
                metadata.is_started,
                &payload,
                request.observed_stage,
                total_stages,
                rules,
            );
            if apply_decision(&mut team, &decision, SystemTime::now()) {
                Ok::<_, ServiceError>(TxStep::Commit(team.into(), decision))
            } else {
                Ok(TxStep::Skip(decision))
            }
        },
    )
    .await?;

    let team = Team::from(outcome.team);
    let decision = outcome.value;
    let message = decision.message(&team);

    let response = match &decision {
        ScanDecision::Advance { stage, finished, .. } => {
            let (label, outcome) = if *finished {
                ("finished", ScanOutcomeDto::Finished)
            } else {
                ("advanced", ScanOutcomeDto::Advanced)
            };
            info!(team_id = %team.id, stage, score = team.score, outcome = label, "team progressed");
            ScanResponse {
                outcome,
                reason: None,
                message,
                team: TeamView::from(&team),
            }
        }
        ScanDecision::Reject {
            reason, penalty, ..
        } => {
            if *penalty > 0 {
                warn!(
                    team_id = %team.id,
                    reason = reason.code(),
                    penalty,
                    score = team.score,
                    "scan penalised"
                );
            } else {
                debug!(team_id = %team.id, reason = reason.code(), "scan rejected");
            }
            ScanResponse {
                outcome: ScanOutcomeDto::Rejected,
                reason: Some(reason.code().to_string()),
                message,
                team: TeamView::from(&team),
            }
        }
    };

    if outcome.committed {
        let label = match &decision {
            ScanDecision::Advance { finished: true, .. } => "finished",
            ScanDecision::Advance { .. } => "advanced",
            ScanDecision::Reject { reason, .. } => reason.code(),
        };
        sse_events::broadcast_team_progressed(state, &team, label);
        tournament_service::publish_leaderboard(state).await;
    }

    Ok(response)
}

/// Record a tab switch or back navigation reported by the dashboard.
pub async fn report_integrity(
    state: &SharedState,
    team_id: Uuid,
    passcode: &str,
    request: IntegrityRequest,
) -> Result<IntegrityResponse, ServiceError> {
    let (store, metadata, _team) = authorize(state, team_id, passcode).await?;
    let max_warnings = state.config().max_tab_switch_warnings();
    let event: IntegrityEvent = request.event.into();

    // Session flags are read once, as in `scan`.
    let outcome = run_team_transaction(
        store.as_ref(),
        team_id,
        MAX_TRANSACTION_ATTEMPTS,
        |entity| {
            let mut team = Team::from(entity);
            let verdict = evaluate_integrity(
                &mut team,
                event,
                metadata.is_started,
                max_warnings,
                SystemTime::now(),
            );
            if verdict == IntegrityVerdict::Ignored {
                Ok::<_, ServiceError>(TxStep::Skip(verdict))
            } else {
                Ok(TxStep::Commit(team.into(), verdict))
            }
        },
    )
    .await?;

    let team = Team::from(outcome.team);
    match outcome.value {
        IntegrityVerdict::Disqualified => {
            warn!(team_id = %team.id, name = %team.name, event = ?event, "team disqualified");
            sse_events::broadcast_team_disqualified(state, &team);
            tournament_service::publish_leaderboard(state).await;
        }
        IntegrityVerdict::Warned { tab_switches, remaining } => {
            info!(team_id = %team.id, tab_switches, remaining, "integrity warning issued");
        }
        IntegrityVerdict::Ignored => {}
    }

    Ok(IntegrityResponse::new(outcome.value, &team))
}

/// Open the final gate with the round-two secret once the path is complete.
pub async fn gatekeeper(
    state: &SharedState,
    team_id: Uuid,
    passcode: &str,
    request: GatekeeperRequest,
) -> Result<GatekeeperResponse, ServiceError> {
    let (store, _metadata, _team) = authorize(state, team_id, passcode).await?;

    let outcome = run_team_transaction(
        store.as_ref(),
        team_id,
        MAX_TRANSACTION_ATTEMPTS,
        |entity| {
            let mut team = Team::from(entity);
            match evaluate_gate(&mut team, &request.answer, SystemTime::now()) {
                GateVerdict::Unlocked => {
                    Ok::<_, ServiceError>(TxStep::Commit(team.into(), GateVerdict::Unlocked))
                }
                verdict => Ok(TxStep::Skip(verdict)),
            }
        },
    )
    .await?;

    let team = Team::from(outcome.team);
    match outcome.value {
        GateVerdict::Unlocked => {
            info!(team_id = %team.id, name = %team.name, "gate unlocked");
            sse_events::broadcast_gate_unlocked(state, &team);
        }
        GateVerdict::AlreadyUnlocked => {}
        GateVerdict::Refused(refusal) => {
            debug!(team_id = %team.id, reason = refusal.code(), "gate refused");
        }
    }

    Ok(GatekeeperResponse::new(outcome.value, &team))
}
