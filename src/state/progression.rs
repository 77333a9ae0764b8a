//! Stage progression rules applied to a scanned QR payload.
//!
//! [`evaluate_scan`] is pure: it only inspects the team and returns a [`ScanDecision`].
//! [`apply_decision`] turns that decision into a mutation. The service runs both inside
//! the optimistic team transaction, so a decision is always taken against the revision
//! that will be overwritten.

use std::time::SystemTime;

use crate::{
    config::ScoringRules,
    state::hunt::{QrPayload, Team, TeamStatus},
};

/// Why a scan did not advance the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRejection {
    /// Payload is not the expected JSON shape.
    InvalidPayload,
    /// Race has not been started (or was reset).
    TournamentNotStarted,
    /// Team is latched as disqualified.
    Disqualified,
    /// Team already scanned its final stage.
    AlreadyFinished,
    /// Client submitted a stale view of its own progress.
    StageMismatch,
    /// QR code belongs to another path.
    WrongPath,
    /// Stage already completed; replays are harmless.
    AlreadyCompleted,
    /// Stage beyond the next one.
    SequenceBreak,
    /// Another scan for this team is being processed.
    ScanInProgress,
    /// Scanned again too quickly.
    CoolingDown,
}

impl ScanRejection {
    /// Stable identifier sent to clients.
    pub fn code(self) -> &'static str {
        match self {
            ScanRejection::InvalidPayload => "invalid_payload",
            ScanRejection::TournamentNotStarted => "tournament_not_started",
            ScanRejection::Disqualified => "disqualified",
            ScanRejection::AlreadyFinished => "already_finished",
            ScanRejection::StageMismatch => "stage_mismatch",
            ScanRejection::WrongPath => "wrong_path",
            ScanRejection::AlreadyCompleted => "already_completed",
            ScanRejection::SequenceBreak => "sequence_break",
            ScanRejection::ScanInProgress => "scan_in_progress",
            ScanRejection::CoolingDown => "cooling_down",
        }
    }
}

/// Outcome of evaluating a scan against a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    /// Target stage scanned; `finished` when it was the last one.
    Advance { stage: u32, points: i32, finished: bool },
    /// Scan refused, with the score penalty to apply (zero for harmless rejections).
    Reject {
        reason: ScanRejection,
        penalty: i32,
        scanned: Option<QrPayload>,
    },
}

impl ScanDecision {
    fn reject(reason: ScanRejection) -> Self {
        ScanDecision::Reject {
            reason,
            penalty: 0,
            scanned: None,
        }
    }

    /// Whether applying the decision changes the stored team.
    pub fn mutates(&self) -> bool {
        match self {
            ScanDecision::Advance { .. } => true,
            ScanDecision::Reject { penalty, .. } => *penalty > 0,
        }
    }

    /// Message shown on the dashboard.
    pub fn message(&self, team: &Team) -> String {
        match self {
            ScanDecision::Advance { finished: true, .. } => {
                "Final rune deciphered! Your path is complete.".to_string()
            }
            ScanDecision::Advance { stage, .. } => {
                format!("Rune deciphered! Stage {stage} complete.")
            }
            ScanDecision::Reject {
                reason, scanned, ..
            } => rejection_message(*reason, team, scanned.as_ref()),
        }
    }
}

/// Message for a rejection outside of a full decision (throttle, parse failures).
pub fn rejection_message(reason: ScanRejection, team: &Team, scanned: Option<&QrPayload>) -> String {
    match (reason, scanned) {
        (ScanRejection::InvalidPayload, _) => "Invalid rune format!".to_string(),
        (ScanRejection::TournamentNotStarted, _) => "The tournament has not begun yet.".to_string(),
        (ScanRejection::Disqualified, _) => "Your team has been disqualified.".to_string(),
        (ScanRejection::AlreadyFinished, _) => "Your path is already complete.".to_string(),
        (ScanRejection::StageMismatch, _) => {
            "Your progress changed elsewhere. Refresh and try again.".to_string()
        }
        (ScanRejection::WrongPath, Some(payload)) => {
            format!("Wrong path! This rune belongs to {}.", payload.path_id)
        }
        (ScanRejection::WrongPath, None) => "Wrong path!".to_string(),
        (ScanRejection::AlreadyCompleted, Some(payload)) => {
            format!("Stage {} is already complete.", payload.stage)
        }
        (ScanRejection::AlreadyCompleted, None) => "This stage is already complete.".to_string(),
        (ScanRejection::SequenceBreak, Some(payload)) => format!(
            "Wrong sequence! You are looking for stage {}, found {}.",
            team.target_stage(),
            payload.stage
        ),
        (ScanRejection::SequenceBreak, None) => "Wrong sequence!".to_string(),
        (ScanRejection::ScanInProgress, _) => "A scan is already being processed.".to_string(),
        (ScanRejection::CoolingDown, _) => "Steady your wand. Try again in a moment.".to_string(),
    }
}

/// Decide what a scan does to `team`. Checks run in a fixed order; the first failing one wins.
pub fn evaluate_scan(
    team: &Team,
    tournament_started: bool,
    payload: &QrPayload,
    observed_stage: Option<u32>,
    total_stages: u32,
    rules: ScoringRules,
) -> ScanDecision {
    if !tournament_started {
        return ScanDecision::reject(ScanRejection::TournamentNotStarted);
    }
    if team.disqualified {
        return ScanDecision::reject(ScanRejection::Disqualified);
    }
    if team.is_finished() {
        return ScanDecision::reject(ScanRejection::AlreadyFinished);
    }
    if observed_stage.is_some_and(|observed| observed != team.current_stage) {
        return ScanDecision::reject(ScanRejection::StageMismatch);
    }

    let scanned = Some(payload.clone());
    if payload.path_id != team.path {
        return ScanDecision::Reject {
            reason: ScanRejection::WrongPath,
            penalty: rules.wrong_path_penalty,
            scanned,
        };
    }

    let target = team.target_stage();
    if payload.stage < target {
        return ScanDecision::Reject {
            reason: ScanRejection::AlreadyCompleted,
            penalty: 0,
            scanned,
        };
    }
    if payload.stage > target {
        return ScanDecision::Reject {
            reason: ScanRejection::SequenceBreak,
            penalty: rules.sequence_break_penalty,
            scanned,
        };
    }

    ScanDecision::Advance {
        stage: target,
        points: rules.advance_points,
        finished: target >= total_stages,
    }
}

/// Apply `decision` to `team`. Returns `false` when nothing changed.
pub fn apply_decision(team: &mut Team, decision: &ScanDecision, now: SystemTime) -> bool {
    match decision {
        ScanDecision::Advance {
            stage,
            points,
            finished,
        } => {
            team.current_stage = (*stage).max(team.current_stage);
            team.score = team.score.saturating_add(*points);
            if *finished {
                team.status = TeamStatus::Finished;
                team.finished_at = Some(now);
            }
        }
        ScanDecision::Reject { penalty, .. } if *penalty > 0 => {
            team.score = team.score.saturating_sub(*penalty).max(0);
        }
        ScanDecision::Reject { .. } => return false,
    }
    team.last_updated = now;
    true
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    const RULES: ScoringRules = ScoringRules {
        advance_points: 20,
        wrong_path_penalty: 5,
        sequence_break_penalty: 5,
    };

    fn team_at(stage: u32) -> Team {
        let mut team = Team::register(
            Uuid::new_v4(),
            "Eagles".into(),
            "Cho".into(),
            "pw".into(),
            None,
            "Ravenclaw".into(),
            "alpha".into(),
            SystemTime::UNIX_EPOCH,
        );
        team.current_stage = stage;
        team.score = stage as i32 * 20;
        team
    }

    fn payload(path: &str, stage: u32) -> QrPayload {
        QrPayload {
            path_id: path.into(),
            stage,
        }
    }

    fn reason(decision: &ScanDecision) -> Option<ScanRejection> {
        match decision {
            ScanDecision::Reject { reason, .. } => Some(*reason),
            ScanDecision::Advance { .. } => None,
        }
    }

    #[test]
    fn next_stage_advances_and_scores() {
        let mut team = team_at(0);
        let decision = evaluate_scan(&team, true, &payload("alpha", 1), None, 5, RULES);
        assert_eq!(
            decision,
            ScanDecision::Advance {
                stage: 1,
                points: 20,
                finished: false
            }
        );

        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
        assert!(apply_decision(&mut team, &decision, now));
        assert_eq!(team.current_stage, 1);
        assert_eq!(team.score, 20);
        assert_eq!(team.last_updated, now);
        assert_eq!(team.status, TeamStatus::Active);
    }

    #[test]
    fn final_stage_finishes_once() {
        let mut team = team_at(4);
        let decision = evaluate_scan(&team, true, &payload("alpha", 5), None, 5, RULES);
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(600);
        apply_decision(&mut team, &decision, now);

        assert!(team.is_finished());
        assert_eq!(team.finished_at, Some(now));

        let replay = evaluate_scan(&team, true, &payload("alpha", 5), None, 5, RULES);
        assert_eq!(reason(&replay), Some(ScanRejection::AlreadyFinished));
    }

    #[test]
    fn wrong_path_is_penalised_without_moving_stage() {
        let mut team = team_at(2);
        let decision = evaluate_scan(&team, true, &payload("beta", 3), None, 5, RULES);
        assert_eq!(reason(&decision), Some(ScanRejection::WrongPath));

        apply_decision(&mut team, &decision, SystemTime::now());
        assert_eq!(team.current_stage, 2);
        assert_eq!(team.score, 35);
        assert!(decision.message(&team).contains("beta"));
    }

    #[test]
    fn replayed_stage_is_harmless() {
        let mut team = team_at(3);
        let decision = evaluate_scan(&team, true, &payload("alpha", 2), None, 5, RULES);
        assert_eq!(reason(&decision), Some(ScanRejection::AlreadyCompleted));
        assert!(!decision.mutates());
        assert!(!apply_decision(&mut team, &decision, SystemTime::now()));
        assert_eq!(team.score, 60);
    }

    #[test]
    fn skipping_ahead_is_a_sequence_break() {
        let team = team_at(1);
        let decision = evaluate_scan(&team, true, &payload("alpha", 4), None, 5, RULES);
        assert_eq!(reason(&decision), Some(ScanRejection::SequenceBreak));
        assert_eq!(
            decision.message(&team),
            "Wrong sequence! You are looking for stage 2, found 4."
        );
    }

    #[test]
    fn penalties_never_go_below_zero() {
        let mut team = team_at(0);
        let decision = evaluate_scan(&team, true, &payload("gamma", 1), None, 5, RULES);
        apply_decision(&mut team, &decision, SystemTime::now());
        assert_eq!(team.score, 0);
    }

    #[test]
    fn stale_observed_stage_is_rejected_before_path_checks() {
        let team = team_at(2);
        let decision = evaluate_scan(&team, true, &payload("beta", 3), Some(1), 5, RULES);
        assert_eq!(reason(&decision), Some(ScanRejection::StageMismatch));
        assert!(!decision.mutates());

        let decision = evaluate_scan(&team, true, &payload("alpha", 3), Some(2), 5, RULES);
        assert!(matches!(decision, ScanDecision::Advance { stage: 3, .. }));
    }

    #[test]
    fn gate_checks_come_first() {
        let mut team = team_at(1);
        let scan = payload("alpha", 2);
        assert_eq!(
            reason(&evaluate_scan(&team, false, &scan, None, 5, RULES)),
            Some(ScanRejection::TournamentNotStarted)
        );

        team.disqualified = true;
        assert_eq!(
            reason(&evaluate_scan(&team, true, &scan, None, 5, RULES)),
            Some(ScanRejection::Disqualified)
        );
    }

    #[test]
    fn only_the_target_stage_moves_the_counter() {
        for scanned in 0..=7 {
            let mut team = team_at(2);
            let decision = evaluate_scan(&team, true, &payload("alpha", scanned), None, 5, RULES);
            apply_decision(&mut team, &decision, SystemTime::now());
            let expected = if scanned == 3 { 3 } else { 2 };
            assert_eq!(team.current_stage, expected, "scanned stage {scanned}");
        }
    }
}
