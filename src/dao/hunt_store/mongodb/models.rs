use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{TeamEntity, TeamStatusEntity, TournamentMetadataEntity};

pub const METADATA_DOC_ID: &str = "config::metadata";

/// Team document; `revision` is bumped on every write and used as the CAS token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub revision: i64,
    pub tournament_id: String,
    pub name: String,
    pub leader: String,
    pub passcode: String,
    #[serde(default)]
    pub round2_secret: Option<String>,
    pub house: String,
    pub path: String,
    pub current_stage: u32,
    pub score: i32,
    pub status: TeamStatusEntity,
    #[serde(default)]
    pub disqualified: bool,
    #[serde(default)]
    pub tab_switches: u32,
    pub created_at: DateTime,
    pub last_updated: DateTime,
    #[serde(default)]
    pub finished_at: Option<DateTime>,
    #[serde(default)]
    pub gate_unlocked_at: Option<DateTime>,
}

impl MongoTeamDocument {
    pub fn from_entity(team: TeamEntity, revision: i64) -> Self {
        Self {
            id: team.id.to_string(),
            revision,
            tournament_id: team.tournament_id.to_string(),
            name: team.name,
            leader: team.leader,
            passcode: team.passcode,
            round2_secret: team.round2_secret,
            house: team.house,
            path: team.path,
            current_stage: team.current_stage,
            score: team.score,
            status: team.status,
            disqualified: team.disqualified,
            tab_switches: team.tab_switches,
            created_at: DateTime::from_system_time(team.created_at),
            last_updated: DateTime::from_system_time(team.last_updated),
            finished_at: team.finished_at.map(DateTime::from_system_time),
            gate_unlocked_at: team.gate_unlocked_at.map(DateTime::from_system_time),
        }
    }

    pub fn into_entity(self) -> Result<(TeamEntity, i64), MongoDaoError> {
        let id = parse_uuid(&self.id, &self.id)?;
        let tournament_id = parse_uuid(&self.id, &self.tournament_id)?;
        Ok((
            TeamEntity {
                id,
                tournament_id,
                name: self.name,
                leader: self.leader,
                passcode: self.passcode,
                round2_secret: self.round2_secret,
                house: self.house,
                path: self.path,
                current_stage: self.current_stage,
                score: self.score,
                status: self.status,
                disqualified: self.disqualified,
                tab_switches: self.tab_switches,
                created_at: self.created_at.to_system_time(),
                last_updated: self.last_updated.to_system_time(),
                finished_at: self.finished_at.map(DateTime::to_system_time),
                gate_unlocked_at: self.gate_unlocked_at.map(DateTime::to_system_time),
            },
            self.revision,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMetadataDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub revision: i64,
    pub is_started: bool,
    #[serde(default)]
    pub start_time: Option<DateTime>,
    pub active_tournament_id: String,
    pub updated_at: DateTime,
}

impl MongoMetadataDocument {
    pub fn from_entity(metadata: TournamentMetadataEntity, revision: i64) -> Self {
        Self {
            id: METADATA_DOC_ID.to_string(),
            revision,
            is_started: metadata.is_started,
            start_time: metadata.start_time.map(DateTime::from_system_time),
            active_tournament_id: metadata.active_tournament_id.to_string(),
            updated_at: DateTime::from_system_time(metadata.updated_at),
        }
    }

    pub fn into_entity(self) -> Result<(TournamentMetadataEntity, i64), MongoDaoError> {
        let active_tournament_id = parse_uuid(&self.id, &self.active_tournament_id)?;
        Ok((
            TournamentMetadataEntity {
                is_started: self.is_started,
                start_time: self.start_time.map(DateTime::to_system_time),
                active_tournament_id,
                updated_at: self.updated_at.to_system_time(),
            },
            self.revision,
        ))
    }
}

fn parse_uuid(doc_id: &str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::Malformed {
        id: doc_id.to_string(),
        reason: err.to_string(),
    })
}

pub fn doc_id(id: &str) -> Document {
    doc! { "_id": id }
}

/// Filter matching a document only while it still carries `revision`.
pub fn revision_filter(id: &str, revision: i64) -> Document {
    doc! { "_id": id, "revision": revision }
}
