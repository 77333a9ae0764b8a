use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{TeamEntity, TeamStatusEntity, TournamentMetadataEntity};

/// Racing status of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamStatus {
    /// Still progressing through its path.
    Active,
    /// Scanned the final stage.
    Finished,
}

/// Team as seen by the rules. Mirrors the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Stable identifier.
    pub id: Uuid,
    /// Session the team belongs to.
    pub tournament_id: Uuid,
    /// Display name, unique within a session.
    pub name: String,
    /// Team leader.
    pub leader: String,
    /// Login passcode.
    pub passcode: String,
    /// Secret revealed two characters per completed stage.
    pub round2_secret: Option<String>,
    /// Assigned house.
    pub house: String,
    /// Assigned path identifier.
    pub path: String,
    /// Completed stages, starting at zero.
    pub current_stage: u32,
    /// Score, never negative.
    pub score: i32,
    /// Racing status.
    pub status: TeamStatus,
    /// One-way anti-cheat latch.
    pub disqualified: bool,
    /// Reported tab switches.
    pub tab_switches: u32,
    /// Registration time.
    pub created_at: SystemTime,
    /// Last mutation time.
    pub last_updated: SystemTime,
    /// Time the final stage was scanned.
    pub finished_at: Option<SystemTime>,
    /// Time the round-two secret was given at the gate.
    pub gate_unlocked_at: Option<SystemTime>,
}

impl Team {
    /// Build a fresh team at stage zero.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        tournament_id: Uuid,
        name: String,
        leader: String,
        passcode: String,
        round2_secret: Option<String>,
        house: String,
        path: String,
        now: SystemTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            name,
            leader,
            passcode,
            round2_secret,
            house,
            path,
            current_stage: 0,
            score: 0,
            status: TeamStatus::Active,
            disqualified: false,
            tab_switches: 0,
            created_at: now,
            last_updated: now,
            finished_at: None,
            gate_unlocked_at: None,
        }
    }

    /// Stage the team has to scan next.
    pub fn target_stage(&self) -> u32 {
        self.current_stage + 1
    }

    pub fn is_finished(&self) -> bool {
        self.status == TeamStatus::Finished
    }

    /// Revealed part of the round-two secret, padded with `_` to its full length.
    pub fn secret_fragments(&self) -> Option<String> {
        let secret = self.round2_secret.as_deref()?;
        let revealed = (self.current_stage as usize).saturating_mul(2);
        Some(
            secret
                .chars()
                .enumerate()
                .map(|(idx, ch)| if idx < revealed { ch } else { '_' })
                .collect(),
        )
    }
}

/// Session-wide tournament flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentMetadata {
    pub is_started: bool,
    pub start_time: Option<SystemTime>,
    pub active_tournament_id: Uuid,
    pub updated_at: SystemTime,
}

impl TournamentMetadata {
    /// Metadata of a brand new, not yet started session.
    pub fn fresh(now: SystemTime) -> Self {
        Self {
            is_started: false,
            start_time: None,
            active_tournament_id: Uuid::new_v4(),
            updated_at: now,
        }
    }
}

/// Content of a station QR code: `{"path_id": "alpha", "stage": 3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub path_id: String,
    pub stage: u32,
}

impl QrPayload {
    /// Parse the raw text read by the scanner. Anything but the exact JSON shape is rejected.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }

    /// Text to encode into the QR image.
    pub fn encode(&self) -> String {
        serde_json::json!({ "path_id": self.path_id, "stage": self.stage }).to_string()
    }
}

impl From<TeamStatusEntity> for TeamStatus {
    fn from(value: TeamStatusEntity) -> Self {
        match value {
            TeamStatusEntity::Active => TeamStatus::Active,
            TeamStatusEntity::Finished => TeamStatus::Finished,
        }
    }
}

impl From<TeamStatus> for TeamStatusEntity {
    fn from(value: TeamStatus) -> Self {
        match value {
            TeamStatus::Active => TeamStatusEntity::Active,
            TeamStatus::Finished => TeamStatusEntity::Finished,
        }
    }
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            tournament_id: value.tournament_id,
            name: value.name,
            leader: value.leader,
            passcode: value.passcode,
            round2_secret: value.round2_secret,
            house: value.house,
            path: value.path,
            current_stage: value.current_stage,
            score: value.score,
            status: value.status.into(),
            disqualified: value.disqualified,
            tab_switches: value.tab_switches,
            created_at: value.created_at,
            last_updated: value.last_updated,
            finished_at: value.finished_at,
            gate_unlocked_at: value.gate_unlocked_at,
        }
    }
}

impl From<Team> for TeamEntity {
    fn from(value: Team) -> Self {
        Self {
            id: value.id,
            tournament_id: value.tournament_id,
            name: value.name,
            leader: value.leader,
            passcode: value.passcode,
            round2_secret: value.round2_secret,
            house: value.house,
            path: value.path,
            current_stage: value.current_stage,
            score: value.score,
            status: value.status.into(),
            disqualified: value.disqualified,
            tab_switches: value.tab_switches,
            created_at: value.created_at,
            last_updated: value.last_updated,
            finished_at: value.finished_at,
            gate_unlocked_at: value.gate_unlocked_at,
        }
    }
}

impl From<TournamentMetadataEntity> for TournamentMetadata {
    fn from(value: TournamentMetadataEntity) -> Self {
        Self {
            is_started: value.is_started,
            start_time: value.start_time,
            active_tournament_id: value.active_tournament_id,
            updated_at: value.updated_at,
        }
    }
}

impl From<TournamentMetadata> for TournamentMetadataEntity {
    fn from(value: TournamentMetadata) -> Self {
        Self {
            is_started: value.is_started,
            start_time: value.start_time,
            active_tournament_id: value.active_tournament_id,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_parses_exact_shape_only() {
        let payload = QrPayload::parse(r#" {"path_id":"alpha","stage":3} "#).unwrap();
        assert_eq!(payload.path_id, "alpha");
        assert_eq!(payload.stage, 3);

        assert!(QrPayload::parse("alpha-3").is_err());
        assert!(QrPayload::parse(r#"{"path_id":"alpha"}"#).is_err());
        assert!(QrPayload::parse(r#"{"path_id":"alpha","stage":-1}"#).is_err());
    }

    #[test]
    fn encoded_payload_matches_wire_format() {
        let payload = QrPayload {
            path_id: "beta".into(),
            stage: 2,
        };
        assert_eq!(payload.encode(), r#"{"path_id":"beta","stage":2}"#);
    }

    #[test]
    fn secret_fragments_reveal_two_chars_per_stage() {
        let mut team = Team::register(
            Uuid::new_v4(),
            "Snakes".into(),
            "Draco".into(),
            "pass".into(),
            Some("ABCDEFGH".into()),
            "Slytherin".into(),
            "alpha".into(),
            SystemTime::now(),
        );
        assert_eq!(team.secret_fragments().as_deref(), Some("________"));
        team.current_stage = 2;
        assert_eq!(team.secret_fragments().as_deref(), Some("ABCD____"));
        team.current_stage = 7;
        assert_eq!(team.secret_fragments().as_deref(), Some("ABCDEFGH"));
    }
}
