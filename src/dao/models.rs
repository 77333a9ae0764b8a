use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Lifecycle status of a team as persisted by the storage layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatusEntity {
    /// Still racing through its path.
    Active,
    /// Completed the final stage.
    Finished,
}

/// Representation of a competing team stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Tournament session the team was registered in.
    pub tournament_id: Uuid,
    /// Display name chosen for the team, also used to log in.
    pub name: String,
    /// Name of the team leader.
    pub leader: String,
    /// Passcode the team logs in with.
    pub passcode: String,
    /// Optional eight character secret revealed piece by piece as stages are completed.
    #[serde(default)]
    pub round2_secret: Option<String>,
    /// House the team was sorted into.
    pub house: String,
    /// Path (sequence of clues) assigned to the team.
    pub path: String,
    /// Number of completed stages.
    pub current_stage: u32,
    /// Current score.
    pub score: i32,
    /// Racing status.
    pub status: TeamStatusEntity,
    /// One-way latch raised by the anti-cheat rules.
    #[serde(default)]
    pub disqualified: bool,
    /// Number of tab switches reported by the dashboard.
    #[serde(default)]
    pub tab_switches: u32,
    /// Registration timestamp, used as the personal clock start for late joiners.
    pub created_at: SystemTime,
    /// Last time this team was updated.
    pub last_updated: SystemTime,
    /// Time the final stage was scanned.
    #[serde(default)]
    pub finished_at: Option<SystemTime>,
    /// Time the team opened the gate with the round-two secret.
    #[serde(default)]
    pub gate_unlocked_at: Option<SystemTime>,
}

/// Session-wide tournament metadata stored as a single document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentMetadataEntity {
    /// Whether the race is currently running.
    pub is_started: bool,
    /// Global start time of the race.
    #[serde(default)]
    pub start_time: Option<SystemTime>,
    /// Identifier scoping which teams belong to the current run.
    pub active_tournament_id: Uuid,
    /// Last time the metadata was written.
    pub updated_at: SystemTime,
}
