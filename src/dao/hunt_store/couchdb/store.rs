use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    hunt_store::HuntStore,
    models::{TeamEntity, TournamentMetadataEntity},
    storage::{Revision, StorageError, StorageResult, Versioned},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchMetadataDocument, CouchTeamDocument, FIND_PAGE_SIZE, FindResponse, METADATA_DOC_ID,
        PutResponse, team_doc_id, team_index_definition, teams_query,
    },
};

/// [`HuntStore`] backed by a CouchDB database; document `_rev` values act as revisions.
#[derive(Clone)]
pub struct CouchHuntStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchHuntStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .username
                .zip(config.password)
                .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p))),
        };

        store.ensure_database().await?;
        store.ensure_team_index().await?;
        Ok(store)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(database = %database, "creating CouchDB database");
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Write a document and return its new `_rev`. CouchDB answers 409 when the
    /// embedded `_rev` is stale or missing for an existing document.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<Revision>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::RevisionConflict {
                path: doc_id.to_string(),
            }),
            status if status.is_success() => {
                let body = response.json::<PutResponse>().await.map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })?;
                Ok(Revision::new(body.rev))
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn post_json<T>(&self, path: &str, body: &serde_json::Value) -> CouchResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn ensure_team_index(&self) -> CouchResult<()> {
        let _: serde_json::Value = self.post_json("_index", &team_index_definition()).await?;
        Ok(())
    }

    /// Team documents of one session, paged through `_find` bookmarks.
    async fn find_team_documents(&self, tournament_id: Uuid) -> CouchResult<Vec<CouchTeamDocument>> {
        const FIND: &str = "_find";
        let mut documents = Vec::new();
        let mut bookmark: Option<String> = None;

        loop {
            let page: FindResponse = self
                .post_json(FIND, &teams_query(tournament_id, bookmark.as_deref()))
                .await?;
            let fetched = page.docs.len();
            for doc in page.docs {
                let id = doc
                    .get("_id")
                    .and_then(|id| id.as_str())
                    .unwrap_or(FIND)
                    .to_string();
                documents.push(
                    from_value(doc)
                        .map_err(|source| CouchDaoError::DeserializeValue { path: id, source })?,
                );
            }
            match page.bookmark {
                Some(next) if fetched == FIND_PAGE_SIZE => bookmark = Some(next),
                _ => break,
            }
        }

        Ok(documents)
    }
}

impl HuntStore for CouchHuntStore {
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchTeamDocument::from((team, None));
            match store.put_document(&doc.id, &doc).await {
                Ok(rev) => Ok(rev),
                Err(CouchDaoError::RevisionConflict { path }) => {
                    Err(StorageError::Duplicate { id: path })
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Versioned<TeamEntity>>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(doc) = store
                .get_document::<CouchTeamDocument>(&team_doc_id(id))
                .await?
            else {
                return Ok(None);
            };
            let (team, rev) = doc.into_parts()?;
            Ok(rev.map(|rev| Versioned {
                value: team,
                revision: Revision::new(rev),
            }))
        })
    }

    fn list_teams(&self, tournament_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store.find_team_documents(tournament_id).await?;
            let mut teams = Vec::with_capacity(docs.len());
            for doc in docs {
                let (team, _) = doc.into_parts()?;
                teams.push(team);
            }
            teams.sort_by_key(|team| team.created_at);
            Ok(teams)
        })
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected: Revision,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchTeamDocument::from((team, Some(expected.as_str().to_string())));
            store.put_document(&doc.id, &doc).await.map_err(Into::into)
        })
    }

    fn load_metadata(
        &self,
    ) -> BoxFuture<'static, StorageResult<Option<Versioned<TournamentMetadataEntity>>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchMetadataDocument>(METADATA_DOC_ID)
                .await?;
            Ok(doc.and_then(|doc| {
                doc.rev.map(|rev| Versioned {
                    value: doc.metadata,
                    revision: Revision::new(rev),
                })
            }))
        })
    }

    fn save_metadata(
        &self,
        metadata: TournamentMetadataEntity,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move {
            let creating = expected.is_none();
            let doc = CouchMetadataDocument::from((
                metadata,
                expected.map(|rev| rev.as_str().to_string()),
            ));
            match store.put_document(METADATA_DOC_ID, &doc).await {
                Ok(rev) => Ok(rev),
                Err(CouchDaoError::RevisionConflict { path }) if creating => {
                    Err(StorageError::Duplicate { id: path })
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_database().await?;
            store.ensure_team_index().await?;
            Ok(())
        })
    }
}
