use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dao::{
    hunt_store::couchdb::error::CouchDaoError,
    models::{TeamEntity, TournamentMetadataEntity},
};

pub const TEAM_PREFIX: &str = "team::";
pub const METADATA_DOC_ID: &str = "config::metadata";
/// Mango index (and design document) over the team `tournament_id` field.
pub const TEAM_TOURNAMENT_INDEX: &str = "team-tournament-id";
pub const FIND_PAGE_SIZE: usize = 200;

/// Body returned by `_find`.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
    #[serde(default)]
    pub bookmark: Option<String>,
}

/// `_index` request creating [`TEAM_TOURNAMENT_INDEX`]; CouchDB answers `exists` when it is already there.
pub fn team_index_definition() -> Value {
    json!({
        "index": { "fields": ["tournament_id"] },
        "name": TEAM_TOURNAMENT_INDEX,
        "ddoc": TEAM_TOURNAMENT_INDEX,
        "type": "json",
    })
}

/// One page of the teams registered in `tournament_id`. The metadata document has no
/// `tournament_id` field, so only team documents match.
pub fn teams_query(tournament_id: Uuid, bookmark: Option<&str>) -> Value {
    let mut query = json!({
        "selector": { "tournament_id": tournament_id.to_string() },
        "use_index": TEAM_TOURNAMENT_INDEX,
        "limit": FIND_PAGE_SIZE,
    });
    if let Some(bookmark) = bookmark {
        query["bookmark"] = json!(bookmark);
    }
    query
}

/// Body returned by CouchDB after a successful `PUT`.
#[derive(Debug, Deserialize)]
pub struct PutResponse {
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchTeamDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub team: TeamEntity,
}

impl From<(TeamEntity, Option<String>)> for CouchTeamDocument {
    fn from((team, rev): (TeamEntity, Option<String>)) -> Self {
        Self {
            id: team_doc_id(team.id),
            rev,
            team,
        }
    }
}

impl CouchTeamDocument {
    /// Split the document into the entity and its revision, checking the identifier.
    pub fn into_parts(self) -> Result<(TeamEntity, Option<String>), CouchDaoError> {
        let id = extract_uuid(&self.id)?;
        if id != self.team.id {
            return Err(CouchDaoError::InvalidDocId {
                doc_id: self.id,
                kind: "identifier does not match body",
            });
        }
        Ok((self.team, self.rev))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchMetadataDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub metadata: TournamentMetadataEntity,
}

impl From<(TournamentMetadataEntity, Option<String>)> for CouchMetadataDocument {
    fn from((metadata, rev): (TournamentMetadataEntity, Option<String>)) -> Self {
        Self {
            id: METADATA_DOC_ID.to_string(),
            rev,
            metadata,
        }
    }
}

pub fn team_doc_id(id: Uuid) -> String {
    format!("{}{}", TEAM_PREFIX, id)
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}
