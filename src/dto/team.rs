//! DTOs exchanged with the team dashboard.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_not_blank},
    state::{
        gatekeeper::GateVerdict,
        hunt::{Team, TeamStatus},
        integrity::{IntegrityEvent, IntegrityVerdict},
    },
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatusDto {
    Active,
    Finished,
}

impl From<TeamStatus> for TeamStatusDto {
    fn from(value: TeamStatus) -> Self {
        match value {
            TeamStatus::Active => TeamStatusDto::Active,
            TeamStatus::Finished => TeamStatusDto::Finished,
        }
    }
}

/// Team projection without credentials, safe for public streams.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamView {
    pub id: Uuid,
    pub name: String,
    pub leader: String,
    pub house: String,
    pub path: String,
    pub current_stage: u32,
    pub score: i32,
    pub status: TeamStatusDto,
    pub disqualified: bool,
    pub tab_switches: u32,
    /// RFC 3339 timestamp.
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_unlocked_at: Option<String>,
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            leader: team.leader.clone(),
            house: team.house.clone(),
            path: team.path.clone(),
            current_stage: team.current_stage,
            score: team.score,
            status: team.status.into(),
            disqualified: team.disqualified,
            tab_switches: team.tab_switches,
            created_at: format_system_time(team.created_at),
            finished_at: team.finished_at.map(format_system_time),
            gate_unlocked_at: team.gate_unlocked_at.map(format_system_time),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub passcode: String,
}

/// Returned on login; the client keeps the id and sends its passcode in `X-Team-Passcode`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSession {
    pub team_id: Uuid,
    pub name: String,
    pub leader: String,
    pub house: String,
    pub path: String,
    pub current_stage: u32,
    pub score: i32,
}

impl From<&Team> for TeamSession {
    fn from(team: &Team) -> Self {
        Self {
            team_id: team.id,
            name: team.name.clone(),
            leader: team.leader.clone(),
            house: team.house.clone(),
            path: team.path.clone(),
            current_stage: team.current_stage,
            score: team.score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub team: TeamView,
    pub total_stages: u32,
    pub tournament_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Used by the client to reconcile its local clock.
    pub server_time: String,
    pub elapsed_ms: u64,
    /// `HH:MM:SS`.
    pub elapsed: String,
    /// Clue for the next stage, or a waiting message.
    pub current_clue: String,
    /// Revealed part of the round-two secret, `_` for hidden characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_fragments: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScanRequest {
    /// Raw text decoded from the QR code.
    #[validate(length(min = 1, max = 1024))]
    pub raw: String,
    /// Stage the dashboard believes the team is at; a mismatch is rejected.
    #[serde(default)]
    pub observed_stage: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcomeDto {
    Advanced,
    Finished,
    Rejected,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    pub outcome: ScanOutcomeDto,
    /// Machine readable rejection code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
    pub team: TeamView,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityEventDto {
    TabHidden,
    BackNavigation,
}

impl From<IntegrityEventDto> for IntegrityEvent {
    fn from(value: IntegrityEventDto) -> Self {
        match value {
            IntegrityEventDto::TabHidden => IntegrityEvent::TabHidden,
            IntegrityEventDto::BackNavigation => IntegrityEvent::BackNavigation,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntegrityRequest {
    pub event: IntegrityEventDto,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityVerdictDto {
    Warned,
    Disqualified,
    Ignored,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntegrityResponse {
    pub verdict: IntegrityVerdictDto,
    pub tab_switches: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_warnings: Option<u32>,
    pub disqualified: bool,
}

impl IntegrityResponse {
    pub fn new(verdict: IntegrityVerdict, team: &Team) -> Self {
        let (verdict, remaining_warnings) = match verdict {
            IntegrityVerdict::Warned { remaining, .. } => {
                (IntegrityVerdictDto::Warned, Some(remaining))
            }
            IntegrityVerdict::Disqualified => (IntegrityVerdictDto::Disqualified, None),
            IntegrityVerdict::Ignored => (IntegrityVerdictDto::Ignored, None),
        };
        Self {
            verdict,
            tab_switches: team.tab_switches,
            remaining_warnings,
            disqualified: team.disqualified,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GatekeeperRequest {
    /// Round-two secret as typed by the team; case is ignored.
    #[validate(custom(function = "validate_not_blank"), length(max = 64))]
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcomeDto {
    Unlocked,
    AlreadyUnlocked,
    Refused,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GatekeeperResponse {
    pub outcome: GateOutcomeDto,
    /// Machine readable refusal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
    pub team: TeamView,
}

impl GatekeeperResponse {
    pub fn new(verdict: GateVerdict, team: &Team) -> Self {
        let (outcome, reason, message) = match verdict {
            GateVerdict::Unlocked => (
                GateOutcomeDto::Unlocked,
                None,
                "The Gate opens. Well played!".to_string(),
            ),
            GateVerdict::AlreadyUnlocked => (
                GateOutcomeDto::AlreadyUnlocked,
                None,
                "The Gate is already open.".to_string(),
            ),
            GateVerdict::Refused(refusal) => (
                GateOutcomeDto::Refused,
                Some(refusal.code().to_string()),
                refusal.message().to_string(),
            ),
        };
        Self {
            outcome,
            reason,
            message,
            team: TeamView::from(team),
        }
    }
}
