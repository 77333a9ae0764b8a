//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        format_system_time,
        public::PhaseDto,
        team::TeamStatusDto,
        validation::{validate_not_blank, validate_round2_secret},
    },
    state::hunt::Team,
};

/// Registration form submitted by the organiser.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterTeamRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 64))]
    pub name: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 64))]
    pub leader: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 64))]
    pub passcode: String,
    /// Exactly eight characters when present.
    #[serde(default)]
    #[validate(custom(function = "validate_round2_secret"))]
    pub round2_secret: Option<String>,
}

/// Full team record, credentials included.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminTeamView {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub name: String,
    pub leader: String,
    pub passcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round2_secret: Option<String>,
    pub house: String,
    pub path: String,
    pub current_stage: u32,
    pub score: i32,
    pub status: TeamStatusDto,
    pub disqualified: bool,
    pub tab_switches: u32,
    pub created_at: String,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_unlocked_at: Option<String>,
}

impl From<&Team> for AdminTeamView {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            tournament_id: team.tournament_id,
            name: team.name.clone(),
            leader: team.leader.clone(),
            passcode: team.passcode.clone(),
            round2_secret: team.round2_secret.clone(),
            house: team.house.clone(),
            path: team.path.clone(),
            current_stage: team.current_stage,
            score: team.score,
            status: team.status.into(),
            disqualified: team.disqualified,
            tab_switches: team.tab_switches,
            created_at: format_system_time(team.created_at),
            last_updated: format_system_time(team.last_updated),
            finished_at: team.finished_at.map(format_system_time),
            gate_unlocked_at: team.gate_unlocked_at.map(format_system_time),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TournamentStatusResponse {
    pub phase: PhaseDto,
    pub is_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub active_tournament_id: Uuid,
    pub team_count: usize,
    pub finished_count: usize,
    pub disqualified_count: usize,
    pub server_time: String,
}

/// One printable station code.
#[derive(Debug, Serialize, ToSchema)]
pub struct QrCodeEntry {
    pub stage: u32,
    /// Human label printed under the code.
    pub label: String,
    /// Exact text to encode into the QR image.
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clue: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QrCodesResponse {
    pub path_id: String,
    pub codes: Vec<QrCodeEntry>,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}
