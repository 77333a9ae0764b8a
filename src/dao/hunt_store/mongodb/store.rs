use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{METADATA_DOC_ID, MongoMetadataDocument, MongoTeamDocument, doc_id, revision_filter},
};
use crate::dao::{
    hunt_store::HuntStore,
    models::{TeamEntity, TournamentMetadataEntity},
    storage::{Revision, StorageError, StorageResult, Versioned},
};

const TEAM_COLLECTION_NAME: &str = "teams";
const METADATA_COLLECTION_NAME: &str = "metadata";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// [`HuntStore`] backed by MongoDB; an integer `revision` field guards conditional writes.
#[derive(Clone)]
pub struct MongoHuntStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

fn parse_revision(id: &str, revision: &Revision) -> StorageResult<i64> {
    revision
        .as_str()
        .parse()
        .map_err(|_| StorageError::conflict(id))
}

fn revision(value: i64) -> Revision {
    Revision::new(value.to_string())
}

impl MongoHuntStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_, database) = establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "tournament_id": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("team_tournament_idx".to_owned()))
                    .build(),
            )
            .build();

        self.teams()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TEAM_COLLECTION_NAME,
                index: "tournament_id,created_at",
                source,
            })?;
        Ok(())
    }

    async fn teams(&self) -> Collection<MongoTeamDocument> {
        self.inner
            .database
            .read()
            .await
            .collection::<MongoTeamDocument>(TEAM_COLLECTION_NAME)
    }

    async fn metadata(&self) -> Collection<MongoMetadataDocument> {
        self.inner
            .database
            .read()
            .await
            .collection::<MongoMetadataDocument>(METADATA_COLLECTION_NAME)
    }

    async fn insert_team(&self, team: TeamEntity) -> StorageResult<Revision> {
        let document = MongoTeamDocument::from_entity(team, 1);
        match self.teams().await.insert_one(&document).await {
            Ok(_) => Ok(revision(1)),
            Err(source) if is_duplicate_key(&source) => {
                Err(StorageError::Duplicate { id: document.id })
            }
            Err(source) => Err(MongoDaoError::Write {
                id: document.id,
                source,
            }
            .into()),
        }
    }

    async fn find_team(&self, id: Uuid) -> MongoResult<Option<Versioned<TeamEntity>>> {
        let id = id.to_string();
        let document = self
            .teams()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::Load { id, source })?;

        document
            .map(|doc| {
                doc.into_entity().map(|(team, rev)| Versioned {
                    value: team,
                    revision: revision(rev),
                })
            })
            .transpose()
    }

    async fn list_teams(&self, tournament_id: Uuid) -> MongoResult<Vec<TeamEntity>> {
        let tournament_id = tournament_id.to_string();
        let documents: Vec<MongoTeamDocument> = self
            .teams()
            .await
            .find(doc! { "tournament_id": &tournament_id })
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(|source| MongoDaoError::ListTeams {
                tournament_id: tournament_id.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListTeams {
                tournament_id: tournament_id.clone(),
                source,
            })?;

        documents
            .into_iter()
            .map(|doc| doc.into_entity().map(|(team, _)| team))
            .collect()
    }

    async fn replace_team(&self, team: TeamEntity, expected: Revision) -> StorageResult<Revision> {
        let id = team.id.to_string();
        let current = parse_revision(&id, &expected)?;
        let document = MongoTeamDocument::from_entity(team, current + 1);

        let result = self
            .teams()
            .await
            .replace_one(revision_filter(&id, current), &document)
            .await
            .map_err(|source| MongoDaoError::Write {
                id: id.clone(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::conflict(id));
        }
        Ok(revision(current + 1))
    }

    async fn load_metadata(&self) -> MongoResult<Option<Versioned<TournamentMetadataEntity>>> {
        let document = self
            .metadata()
            .await
            .find_one(doc_id(METADATA_DOC_ID))
            .await
            .map_err(|source| MongoDaoError::Load {
                id: METADATA_DOC_ID.to_string(),
                source,
            })?;

        document
            .map(|doc| {
                doc.into_entity().map(|(metadata, rev)| Versioned {
                    value: metadata,
                    revision: revision(rev),
                })
            })
            .transpose()
    }

    async fn save_metadata(
        &self,
        metadata: TournamentMetadataEntity,
        expected: Option<Revision>,
    ) -> StorageResult<Revision> {
        let collection = self.metadata().await;
        let Some(expected) = expected else {
            let document = MongoMetadataDocument::from_entity(metadata, 1);
            return match collection.insert_one(&document).await {
                Ok(_) => Ok(revision(1)),
                Err(source) if is_duplicate_key(&source) => Err(StorageError::Duplicate {
                    id: METADATA_DOC_ID.to_string(),
                }),
                Err(source) => Err(MongoDaoError::Write {
                    id: METADATA_DOC_ID.to_string(),
                    source,
                }
                .into()),
            };
        };

        let current = parse_revision(METADATA_DOC_ID, &expected)?;
        let document = MongoMetadataDocument::from_entity(metadata, current + 1);
        let result = collection
            .replace_one(revision_filter(METADATA_DOC_ID, current), &document)
            .await
            .map_err(|source| MongoDaoError::Write {
                id: METADATA_DOC_ID.to_string(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::conflict(METADATA_DOC_ID));
        }
        Ok(revision(current + 1))
    }
}

impl HuntStore for MongoHuntStore {
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move { store.insert_team(team).await })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Versioned<TeamEntity>>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team(id).await.map_err(Into::into) })
    }

    fn list_teams(&self, tournament_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_teams(tournament_id).await.map_err(Into::into) })
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected: Revision,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move { store.replace_team(team, expected).await })
    }

    fn load_metadata(
        &self,
    ) -> BoxFuture<'static, StorageResult<Option<Versioned<TournamentMetadataEntity>>>> {
        let store = self.clone();
        Box::pin(async move { store.load_metadata().await.map_err(Into::into) })
    }

    fn save_metadata(
        &self,
        metadata: TournamentMetadataEntity,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move { store.save_metadata(metadata, expected).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
