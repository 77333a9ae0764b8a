use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::team::TeamStatusDto,
    state::{
        leaderboard::{RankedTeam, format_elapsed},
        state_machine::TournamentPhase,
    },
};

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseDto {
    Registration,
    Running,
}

impl From<TournamentPhase> for PhaseDto {
    fn from(value: TournamentPhase) -> Self {
        match value {
            TournamentPhase::Registration => PhaseDto::Registration,
            TournamentPhase::Running => PhaseDto::Running,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardRow {
    /// 1-based position.
    pub rank: usize,
    pub team_id: Uuid,
    pub name: String,
    pub house: String,
    pub path: String,
    pub current_stage: u32,
    pub score: i32,
    pub status: TeamStatusDto,
    pub disqualified: bool,
    pub elapsed_ms: u64,
    pub elapsed: String,
}

impl From<&RankedTeam<'_>> for LeaderboardRow {
    fn from(row: &RankedTeam<'_>) -> Self {
        Self {
            rank: row.rank,
            team_id: row.team.id,
            name: row.team.name.clone(),
            house: row.team.house.clone(),
            path: row.team.path.clone(),
            current_stage: row.team.current_stage,
            score: row.team.score,
            status: row.team.status.into(),
            disqualified: row.team.disqualified,
            elapsed_ms: u64::try_from(row.elapsed.as_millis()).unwrap_or(u64::MAX),
            elapsed: format_elapsed(row.elapsed),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub tournament_id: Uuid,
    pub is_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub server_time: String,
    pub total_stages: u32,
    pub rows: Vec<LeaderboardRow>,
}

/// Tournament status exposed to projectors and dashboards.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicTournamentResponse {
    pub phase: PhaseDto,
    pub is_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub server_time: String,
    pub total_stages: u32,
    pub degraded: bool,
}
