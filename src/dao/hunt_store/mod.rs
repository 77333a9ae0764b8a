#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{TeamEntity, TournamentMetadataEntity};
use crate::dao::storage::{Revision, StorageResult, Versioned};
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the document store holding teams and the tournament metadata.
///
/// Every write returns the new [`Revision`] of the document; conditional writes fail with
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict) when the stored
/// revision no longer matches the expected one.
pub trait HuntStore: Send + Sync {
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<Revision>>;
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Versioned<TeamEntity>>>>;
    fn list_teams(&self, tournament_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    fn replace_team(
        &self,
        team: TeamEntity,
        expected: Revision,
    ) -> BoxFuture<'static, StorageResult<Revision>>;
    fn load_metadata(
        &self,
    ) -> BoxFuture<'static, StorageResult<Option<Versioned<TournamentMetadataEntity>>>>;
    fn save_metadata(
        &self,
        metadata: TournamentMetadataEntity,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
