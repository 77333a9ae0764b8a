//! Anti-cheat latch driven by events reported from the dashboard.

use std::time::SystemTime;

use crate::state::hunt::Team;

/// Suspicious browser activity reported by a team dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityEvent {
    /// The dashboard tab lost visibility.
    TabHidden,
    /// The browser back button was used.
    BackNavigation,
}

/// What the latch decided for a reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityVerdict {
    /// Event counted, team warned.
    Warned { tab_switches: u32, remaining: u32 },
    /// Team is now disqualified.
    Disqualified,
    /// Event does not apply (race not running, team already latched or finished).
    Ignored,
}

/// Decide the verdict and apply it to `team`.
pub fn evaluate_integrity(
    team: &mut Team,
    event: IntegrityEvent,
    tournament_started: bool,
    max_warnings: u32,
    now: SystemTime,
) -> IntegrityVerdict {
    if !tournament_started || team.disqualified || team.is_finished() {
        return IntegrityVerdict::Ignored;
    }

    let verdict = match event {
        IntegrityEvent::BackNavigation => IntegrityVerdict::Disqualified,
        IntegrityEvent::TabHidden => {
            team.tab_switches = team.tab_switches.saturating_add(1);
            if team.tab_switches > max_warnings {
                IntegrityVerdict::Disqualified
            } else {
                IntegrityVerdict::Warned {
                    tab_switches: team.tab_switches,
                    remaining: max_warnings - team.tab_switches,
                }
            }
        }
    };

    if verdict == IntegrityVerdict::Disqualified {
        team.disqualified = true;
    }
    team.last_updated = now;
    verdict
}

/// Manual disqualification by the organiser. Returns `false` when already latched.
pub fn disqualify(team: &mut Team, now: SystemTime) -> bool {
    if team.disqualified {
        return false;
    }
    team.disqualified = true;
    team.last_updated = now;
    true
}
