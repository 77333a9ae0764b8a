//! Optimistic read-modify-write over a single team document.

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    hunt_store::HuntStore,
    models::TeamEntity,
    storage::{Revision, StorageError},
};

/// Number of read-decide-write rounds attempted before giving up on a contended document.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Outcome of one decision round inside [`run_team_transaction`].
pub enum TxStep<T> {
    /// Persist the updated team and return the value once the write lands.
    Commit(TeamEntity, T),
    /// Leave the document untouched.
    Skip(T),
}

/// Result of a transaction that completed.
#[derive(Debug)]
pub struct TxOutcome<T> {
    pub value: T,
    /// Team as stored after the transaction (the committed version, or the one read on skip).
    pub team: TeamEntity,
    pub committed: bool,
}

#[derive(Debug, Error)]
pub enum TxError<E> {
    #[error("team `{0}` not found")]
    NotFound(Uuid),
    #[error("team `{id}` kept changing after {attempts} attempt(s)")]
    Exhausted { id: Uuid, attempts: u32 },
    #[error(transparent)]
    Storage(StorageError),
    #[error("transaction aborted")]
    Aborted(E),
}

/// Read the team, let `step` decide, then write conditionally on the revision that was read.
///
/// A concurrent write makes the conditional write fail; the closure is then re-run on the
/// fresh document, so it must be free of side effects.
pub async fn run_team_transaction<T, E, F>(
    store: &dyn HuntStore,
    team_id: Uuid,
    max_attempts: u32,
    mut step: F,
) -> Result<TxOutcome<T>, TxError<E>>
where
    F: FnMut(TeamEntity) -> Result<TxStep<T>, E>,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let versioned = store
            .find_team(team_id)
            .await
            .map_err(TxError::Storage)?
            .ok_or(TxError::NotFound(team_id))?;
        let read_revision: Revision = versioned.revision;

        match step(versioned.value.clone()).map_err(TxError::Aborted)? {
            TxStep::Skip(value) => {
                return Ok(TxOutcome {
                    value,
                    team: versioned.value,
                    committed: false,
                });
            }
            TxStep::Commit(team, value) => {
                match store.replace_team(team.clone(), read_revision).await {
                    Ok(_) => {
                        return Ok(TxOutcome {
                            value,
                            team,
                            committed: true,
                        });
                    }
                    Err(StorageError::Conflict { .. }) => {
                        debug!(team_id = %team_id, attempt, "team write lost a race, retrying");
                    }
                    Err(err) => return Err(TxError::Storage(err)),
                }
            }
        }
    }

    Err(TxError::Exhausted {
        id: team_id,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering},
        },
        time::SystemTime,
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::dao::{
        hunt_store::memory::MemoryHuntStore,
        models::{TeamStatusEntity, TournamentMetadataEntity},
        storage::{StorageResult, Versioned},
    };

    fn team() -> TeamEntity {
        let now = SystemTime::now();
        TeamEntity {
            id: Uuid::new_v4(),
            tournament_id: Uuid::new_v4(),
            name: "Lions".into(),
            leader: "Neville".into(),
            passcode: "sword".into(),
            round2_secret: None,
            house: "Gryffindor".into(),
            path: "gamma".into(),
            current_stage: 0,
            score: 0,
            status: TeamStatusEntity::Active,
            disqualified: false,
            tab_switches: 0,
            created_at: now,
            last_updated: now,
            finished_at: None,
            gate_unlocked_at: None,
        }
    }

    /// Delegates to memory but bumps the revision behind the caller's back a fixed number of times.
    struct Interfering {
        inner: MemoryHuntStore,
        remaining: Arc<AtomicU32>,
    }

    impl HuntStore for Interfering {
        fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<Revision>> {
            self.inner.insert_team(team)
        }

        fn find_team(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<Versioned<TeamEntity>>>> {
            let inner = self.inner.clone();
            let remaining = self.remaining.clone();
            Box::pin(async move {
                let found = inner.find_team(id).await?;
                if let Some(versioned) = &found {
                    if remaining
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok()
                    {
                        inner
                            .replace_team(versioned.value.clone(), versioned.revision.clone())
                            .await?;
                    }
                }
                Ok(found)
            })
        }

        fn list_teams(
            &self,
            tournament_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
            self.inner.list_teams(tournament_id)
        }

        fn replace_team(
            &self,
            team: TeamEntity,
            expected: Revision,
        ) -> BoxFuture<'static, StorageResult<Revision>> {
            self.inner.replace_team(team, expected)
        }

        fn load_metadata(
            &self,
        ) -> BoxFuture<'static, StorageResult<Option<Versioned<TournamentMetadataEntity>>>>
        {
            self.inner.load_metadata()
        }

        fn save_metadata(
            &self,
            metadata: TournamentMetadataEntity,
            expected: Option<Revision>,
        ) -> BoxFuture<'static, StorageResult<Revision>> {
            self.inner.save_metadata(metadata, expected)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    fn advance(mut team: TeamEntity) -> Result<TxStep<u32>, ()> {
        team.current_stage += 1;
        let stage = team.current_stage;
        Ok(TxStep::Commit(team, stage))
    }

    #[tokio::test]
    async fn commit_persists_the_new_document() {
        let store = MemoryHuntStore::new();
        let team = team();
        store.insert_team(team.clone()).await.unwrap();

        let outcome = run_team_transaction(&store, team.id, MAX_TRANSACTION_ATTEMPTS, advance)
            .await
            .unwrap();
        assert!(outcome.committed);
        assert_eq!(outcome.value, 1);

        let stored = store.find_team(team.id).await.unwrap().unwrap();
        assert_eq!(stored.value.current_stage, 1);
    }

    #[tokio::test]
    async fn retries_after_conflict_and_reevaluates() {
        let store = Interfering {
            inner: MemoryHuntStore::new(),
            remaining: Arc::new(AtomicU32::new(2)),
        };
        let team = team();
        store.insert_team(team.clone()).await.unwrap();

        let calls = AtomicU32::new(0);
        let outcome = run_team_transaction(&store, team.id, MAX_TRANSACTION_ATTEMPTS, |team| {
            calls.fetch_add(1, Ordering::SeqCst);
            advance(team)
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.team.current_stage, 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let store = Interfering {
            inner: MemoryHuntStore::new(),
            remaining: Arc::new(AtomicU32::new(u32::MAX)),
        };
        let team = team();
        store.insert_team(team.clone()).await.unwrap();

        let err = run_team_transaction(&store, team.id, 3, advance)
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn skip_does_not_write() {
        let store = MemoryHuntStore::new();
        let team = team();
        let rev = store.insert_team(team.clone()).await.unwrap();

        let outcome = run_team_transaction(&store, team.id, 1, |_| Ok::<_, ()>(TxStep::Skip("noop")))
            .await
            .unwrap();
        assert!(!outcome.committed);

        let stored = store.find_team(team.id).await.unwrap().unwrap();
        assert_eq!(stored.revision, rev);
    }

    #[tokio::test]
    async fn missing_team_is_reported() {
        let store = MemoryHuntStore::new();
        let err = run_team_transaction(&store, Uuid::new_v4(), 1, advance)
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::NotFound(_)));
    }
}
