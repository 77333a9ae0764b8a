//! In-process document store with numeric revisions, used for local runs and tests.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    hunt_store::HuntStore,
    models::{TeamEntity, TournamentMetadataEntity},
    storage::{Revision, StorageError, StorageResult, Versioned},
};

const METADATA_DOC_ID: &str = "config::metadata";

#[derive(Clone, Default)]
pub struct MemoryHuntStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    teams: HashMap<Uuid, (TeamEntity, u64)>,
    metadata: Option<(TournamentMetadataEntity, u64)>,
}

impl MemoryHuntStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn revision(value: u64) -> Revision {
    Revision::new(value.to_string())
}

fn same_revision(expected: &Revision, current: u64) -> bool {
    expected.as_str().parse::<u64>().ok() == Some(current)
}

impl HuntStore for MemoryHuntStore {
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<Revision>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            if guard.teams.contains_key(&team.id) {
                return Err(StorageError::Duplicate {
                    id: team.id.to_string(),
                });
            }
            guard.teams.insert(team.id, (team, 1));
            Ok(revision(1))
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Versioned<TeamEntity>>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let guard = inner.read().await;
            Ok(guard.teams.get(&id).map(|(team, rev)| Versioned {
                value: team.clone(),
                revision: revision(*rev),
            }))
        })
    }

    fn list_teams(&self, tournament_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let guard = inner.read().await;
            let mut teams: Vec<TeamEntity> = guard
                .teams
                .values()
                .filter(|(team, _)| team.tournament_id == tournament_id)
                .map(|(team, _)| team.clone())
                .collect();
            teams.sort_by_key(|team| team.created_at);
            Ok(teams)
        })
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected: Revision,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            let Some((stored, rev)) = guard.teams.get_mut(&team.id) else {
                return Err(StorageError::conflict(team.id));
            };
            if !same_revision(&expected, *rev) {
                return Err(StorageError::conflict(team.id));
            }
            *stored = team;
            *rev += 1;
            Ok(revision(*rev))
        })
    }

    fn load_metadata(
        &self,
    ) -> BoxFuture<'static, StorageResult<Option<Versioned<TournamentMetadataEntity>>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let guard = inner.read().await;
            Ok(guard.metadata.as_ref().map(|(metadata, rev)| Versioned {
                value: metadata.clone(),
                revision: revision(*rev),
            }))
        })
    }

    fn save_metadata(
        &self,
        metadata: TournamentMetadataEntity,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            let next = match (&guard.metadata, expected) {
                (None, None) => 1,
                (Some((_, rev)), Some(expected)) if same_revision(&expected, *rev) => rev + 1,
                (Some(_), None) => {
                    return Err(StorageError::Duplicate {
                        id: METADATA_DOC_ID.into(),
                    });
                }
                _ => return Err(StorageError::conflict(METADATA_DOC_ID)),
            };
            guard.metadata = Some((metadata, next));
            Ok(revision(next))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
