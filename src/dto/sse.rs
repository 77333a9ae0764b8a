use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{admin::AdminTeamView, public::PhaseDto, team::TeamView};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Serialise `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Admin-only: a team was registered (credentials included).
pub struct TeamRegisteredEvent {
    pub team: AdminTeamView,
}

#[derive(Debug, Serialize, ToSchema)]
/// A team's stage, score or status changed after a scan or at the gate.
pub struct TeamProgressedEvent {
    pub team: TeamView,
    /// `advanced`, `finished`, `gate_unlocked`, or the rejection code that cost a penalty.
    pub outcome: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// The anti-cheat latch was raised for a team.
pub struct TeamDisqualifiedEvent {
    pub team_id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after `start` or `reset`.
pub struct LifecycleEvent {
    pub phase: PhaseDto,
    pub is_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub active_tournament_id: Uuid,
}
