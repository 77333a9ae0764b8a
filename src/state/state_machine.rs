use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Phases of a tournament session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentPhase {
    /// Teams can register; scans are refused.
    Registration,
    /// Race clock is running.
    Running,
}

impl TournamentPhase {
    /// Phase implied by the persisted `is_started` flag.
    pub fn from_started(is_started: bool) -> Self {
        if is_started {
            TournamentPhase::Running
        } else {
            TournamentPhase::Registration
        }
    }
}

/// Organiser commands driving the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentEvent {
    /// Start the race clock.
    Start,
    /// Open a new session; previous teams drop out of every view.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    pub from: TournamentPhase,
    pub event: TournamentEvent,
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    NoPending,
    IdMismatch { expected: PlanId, got: PlanId },
    /// Phase changed since the plan was created.
    PhaseMismatch {
        expected: TournamentPhase,
        actual: TournamentPhase,
    },
    /// Version changed since the plan was created.
    VersionMismatch { expected: usize, actual: usize },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    NoPending,
    IdMismatch { expected: PlanId, got: PlanId },
}

pub type PlanId = Uuid;

/// A validated transition waiting for its side effects to land.
#[derive(Debug, Clone)]
pub struct Plan {
    pub id: PlanId,
    pub from: TournamentPhase,
    pub to: TournamentPhase,
    pub event: TournamentEvent,
    pub version_next: usize,
    pub pending_since: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: TournamentPhase,
    /// Increments on each applied transition.
    pub version: usize,
    pub pending: Option<TournamentPhase>,
}

/// Two-phase lifecycle: `plan` validates, `apply` commits once persistence succeeded,
/// `abort` drops the plan when it did not.
#[derive(Debug, Clone)]
pub struct TournamentStateMachine {
    phase: TournamentPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for TournamentStateMachine {
    fn default() -> Self {
        Self {
            phase: TournamentPhase::Registration,
            version: 0,
            pending: None,
        }
    }
}

impl TournamentStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TournamentPhase {
        self.phase
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Align the machine with persisted metadata. Ignored while a plan is pending.
    pub fn reseed(&mut self, phase: TournamentPhase) -> bool {
        if self.pending.is_some() || self.phase == phase {
            return false;
        }
        self.phase = phase;
        self.version += 1;
        true
    }

    pub fn plan(&mut self, event: TournamentEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());
        Ok(plan)
    }

    pub fn apply(&mut self, plan_id: PlanId) -> Result<TournamentPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        Ok(self.phase)
    }

    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    fn compute_transition(
        &self,
        event: TournamentEvent,
    ) -> Result<TournamentPhase, InvalidTransition> {
        match (self.phase, event) {
            (TournamentPhase::Registration, TournamentEvent::Start) => Ok(TournamentPhase::Running),
            (_, TournamentEvent::Reset) => Ok(TournamentPhase::Registration),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut TournamentStateMachine, event: TournamentEvent) -> TournamentPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_registration() {
        assert_eq!(
            TournamentStateMachine::new().phase(),
            TournamentPhase::Registration
        );
    }

    #[test]
    fn start_then_reset() {
        let mut sm = TournamentStateMachine::new();
        assert_eq!(apply(&mut sm, TournamentEvent::Start), TournamentPhase::Running);
        assert_eq!(
            apply(&mut sm, TournamentEvent::Reset),
            TournamentPhase::Registration
        );
        assert_eq!(sm.snapshot().version, 2);
    }

    #[test]
    fn starting_twice_is_invalid() {
        let mut sm = TournamentStateMachine::new();
        apply(&mut sm, TournamentEvent::Start);
        let err = sm.plan(TournamentEvent::Start).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTransition(InvalidTransition {
                from: TournamentPhase::Running,
                event: TournamentEvent::Start,
            })
        );
    }

    #[test]
    fn reset_is_allowed_from_registration() {
        let mut sm = TournamentStateMachine::new();
        assert_eq!(
            apply(&mut sm, TournamentEvent::Reset),
            TournamentPhase::Registration
        );
    }

    #[test]
    fn pending_plan_blocks_new_plans_until_aborted() {
        let mut sm = TournamentStateMachine::new();
        let plan = sm.plan(TournamentEvent::Start).unwrap();
        assert_eq!(sm.plan(TournamentEvent::Reset).unwrap_err(), PlanError::AlreadyPending);
        assert_eq!(sm.snapshot().pending, Some(TournamentPhase::Running));

        sm.abort(plan.id).unwrap();
        assert_eq!(sm.phase(), TournamentPhase::Registration);
        assert!(sm.plan(TournamentEvent::Start).is_ok());
    }

    #[test]
    fn apply_with_foreign_id_keeps_plan() {
        let mut sm = TournamentStateMachine::new();
        let plan = sm.plan(TournamentEvent::Start).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert_eq!(sm.apply(plan.id).unwrap(), TournamentPhase::Running);
    }

    #[test]
    fn reseed_follows_persisted_state() {
        let mut sm = TournamentStateMachine::new();
        assert!(sm.reseed(TournamentPhase::Running));
        assert!(!sm.reseed(TournamentPhase::Running));

        let _plan = sm.plan(TournamentEvent::Reset).unwrap();
        assert!(!sm.reseed(TournamentPhase::Registration));
    }
}
