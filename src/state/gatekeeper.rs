//! Final gate: a team that completed its path opens it with the round-two secret.

use std::time::SystemTime;

use crate::state::hunt::Team;

/// Why the gate stayed shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRefusal {
    Disqualified,
    /// Not every stage has been scanned yet.
    NotFinished,
    /// The team was registered without a secret.
    NoSecret,
    WrongAnswer,
}

impl GateRefusal {
    pub fn code(self) -> &'static str {
        match self {
            GateRefusal::Disqualified => "disqualified",
            GateRefusal::NotFinished => "not_finished",
            GateRefusal::NoSecret => "no_secret",
            GateRefusal::WrongAnswer => "wrong_answer",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            GateRefusal::Disqualified => "Your team has been disqualified.",
            GateRefusal::NotFinished => "Complete every stage before approaching the gate.",
            GateRefusal::NoSecret => "No secret was registered for your team. Ask an organiser.",
            GateRefusal::WrongAnswer => "The Gate remains shut.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Correct answer, first time.
    Unlocked,
    /// Correct answer, the gate was already open. Nothing changes.
    AlreadyUnlocked,
    Refused(GateRefusal),
}

/// Check `answer` against the team's secret, ignoring case and surrounding blanks, and
/// stamp the unlock on success.
pub fn evaluate_gate(team: &mut Team, answer: &str, now: SystemTime) -> GateVerdict {
    if team.disqualified {
        return GateVerdict::Refused(GateRefusal::Disqualified);
    }
    if !team.is_finished() {
        return GateVerdict::Refused(GateRefusal::NotFinished);
    }
    let Some(secret) = team.round2_secret.as_deref() else {
        return GateVerdict::Refused(GateRefusal::NoSecret);
    };
    if answer.trim().to_uppercase() != secret.trim().to_uppercase() {
        return GateVerdict::Refused(GateRefusal::WrongAnswer);
    }
    if team.gate_unlocked_at.is_some() {
        return GateVerdict::AlreadyUnlocked;
    }

    team.gate_unlocked_at = Some(now);
    team.last_updated = now;
    GateVerdict::Unlocked
}
