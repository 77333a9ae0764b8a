//! Per-team scan debounce. Purely advisory: the store transaction stays authoritative.

use std::time::{Duration, Instant};

use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::state::progression::ScanRejection;

#[derive(Debug, Clone, Copy)]
enum Slot {
    InFlight,
    Idle { finished_at: Instant },
}

pub struct ScanThrottle {
    cooldown: Duration,
    slots: DashMap<Uuid, Slot>,
}

/// Releases the in-flight slot when dropped, starting the cooldown.
pub struct ScanPermit<'a> {
    throttle: &'a ScanThrottle,
    team_id: Uuid,
}

impl ScanThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            slots: DashMap::new(),
        }
    }

    /// Reserve the team's scan slot.
    pub fn try_acquire(&self, team_id: Uuid) -> Result<ScanPermit<'_>, ScanRejection> {
        self.try_acquire_at(team_id, Instant::now())
    }

    fn try_acquire_at(&self, team_id: Uuid, now: Instant) -> Result<ScanPermit<'_>, ScanRejection> {
        match self.slots.entry(team_id) {
            Entry::Occupied(mut entry) => {
                let slot = *entry.get();
                match slot {
                    Slot::InFlight => return Err(ScanRejection::ScanInProgress),
                    Slot::Idle { finished_at }
                        if now.duration_since(finished_at) < self.cooldown =>
                    {
                        return Err(ScanRejection::CoolingDown);
                    }
                    Slot::Idle { .. } => {
                        entry.insert(Slot::InFlight);
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot::InFlight);
            }
        }
        Ok(ScanPermit {
            throttle: self,
            team_id,
        })
    }

    /// Forget every team, used when a new session starts.
    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl Drop for ScanPermit<'_> {
    fn drop(&mut self) {
        self.throttle.slots.insert(
            self.team_id,
            Slot::Idle {
                finished_at: Instant::now(),
            },
        );
    }
}
