mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use quest_trail_back::{
    config::AppConfig,
    dao::{
        hunt_store::{HuntStore, memory::MemoryHuntStore},
        models::{TeamEntity, TournamentMetadataEntity},
        storage::{Revision, StorageResult, Versioned},
    },
    dto::team::{IntegrityEventDto, IntegrityRequest, IntegrityVerdictDto, ScanOutcomeDto, ScanRequest},
    error::ServiceError,
    services::{admin_service, team_service},
    state::{AppState, SharedState},
};
use tokio::sync::Barrier;
use uuid::Uuid;

use common::{other_path, payload, ready_state, register, scan};

#[tokio::test]
async fn scans_are_rejected_before_the_start() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Badgers").await;

    let response = scan(&state, &team, &team.path, 1).await.unwrap();
    assert_eq!(response.outcome, ScanOutcomeDto::Rejected);
    assert_eq!(response.reason.as_deref(), Some("tournament_not_started"));
    assert_eq!(response.team.current_stage, 0);
}

#[tokio::test]
async fn scanning_every_stage_finishes_the_path() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Lions").await;
    admin_service::start_tournament(&state).await.unwrap();

    for stage in 1..=4 {
        let response = scan(&state, &team, &team.path, stage).await.unwrap();
        assert_eq!(response.outcome, ScanOutcomeDto::Advanced);
        assert_eq!(response.team.current_stage, stage);
    }

    let last = scan(&state, &team, &team.path, 5).await.unwrap();
    assert_eq!(last.outcome, ScanOutcomeDto::Finished);
    assert_eq!(last.team.score, 100);
    assert!(last.team.finished_at.is_some());

    let after = scan(&state, &team, &team.path, 5).await.unwrap();
    assert_eq!(after.reason.as_deref(), Some("already_finished"));
    assert_eq!(after.team.score, 100);
}

#[tokio::test]
async fn penalties_apply_to_wrong_path_and_sequence_break_only() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Snakes").await;
    admin_service::start_tournament(&state).await.unwrap();

    // score never drops below zero
    let wrong = scan(&state, &team, other_path(&team.path), 1).await.unwrap();
    assert_eq!(wrong.reason.as_deref(), Some("wrong_path"));
    assert_eq!(wrong.team.score, 0);

    scan(&state, &team, &team.path, 1).await.unwrap();

    let replay = scan(&state, &team, &team.path, 1).await.unwrap();
    assert_eq!(replay.reason.as_deref(), Some("already_completed"));
    assert_eq!(replay.team.score, 20);

    let skip = scan(&state, &team, &team.path, 3).await.unwrap();
    assert_eq!(skip.reason.as_deref(), Some("sequence_break"));
    assert_eq!(skip.team.score, 15);
    assert_eq!(skip.team.current_stage, 1);

    let wrong = scan(&state, &team, other_path(&team.path), 2).await.unwrap();
    assert_eq!(wrong.team.score, 10);
    assert_eq!(wrong.team.current_stage, 1);
}

#[tokio::test]
async fn malformed_payloads_fail_closed() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Ravens").await;
    admin_service::start_tournament(&state).await.unwrap();

    for raw in ["not json", r#"{"path_id":"alpha"}"#, r#"{"stage":1}"#] {
        let response = team_service::scan(
            &state,
            team.id,
            &team.passcode,
            ScanRequest {
                raw: raw.to_string(),
                observed_stage: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.reason.as_deref(), Some("invalid_payload"));
        assert_eq!(response.team.score, 0);
    }
}

#[tokio::test]
async fn stale_dashboard_view_is_rejected() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Owls").await;
    admin_service::start_tournament(&state).await.unwrap();
    scan(&state, &team, &team.path, 1).await.unwrap();

    let response = team_service::scan(
        &state,
        team.id,
        &team.passcode,
        ScanRequest {
            raw: payload(&team.path, 2),
            observed_stage: Some(0),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.reason.as_deref(), Some("stage_mismatch"));
    assert_eq!(response.team.current_stage, 1);
}

/// Memory store whose first two team writes wait for each other, so both writers hold
/// the same revision when they commit.
struct RacingStore {
    inner: MemoryHuntStore,
    held_writes: Arc<AtomicU32>,
    barrier: Arc<Barrier>,
}

impl RacingStore {
    fn new(inner: MemoryHuntStore) -> Self {
        Self {
            inner,
            held_writes: Arc::new(AtomicU32::new(2)),
            barrier: Arc::new(Barrier::new(2)),
        }
    }
}

impl HuntStore for RacingStore {
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<Revision>> {
        self.inner.insert_team(team)
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Versioned<TeamEntity>>>> {
        self.inner.find_team(id)
    }

    fn list_teams(&self, tournament_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        self.inner.list_teams(tournament_id)
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected: Revision,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let inner = self.inner.clone();
        let held_writes = self.held_writes.clone();
        let barrier = self.barrier.clone();
        Box::pin(async move {
            if held_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                barrier.wait().await;
            }
            inner.replace_team(team, expected).await
        })
    }

    fn load_metadata(
        &self,
    ) -> BoxFuture<'static, StorageResult<Option<Versioned<TournamentMetadataEntity>>>> {
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

async fn instance(store: Arc<dyn HuntStore>) -> SharedState {
    let state = AppState::new(AppConfig::default().with_scan_cooldown(Duration::ZERO));
    state.install_hunt_store(store).await;
    state
}

#[tokio::test]
async fn racing_instances_advance_a_team_once() {
    let store: Arc<dyn HuntStore> = Arc::new(RacingStore::new(MemoryHuntStore::new()));
    // two servers over one database: separate throttles, shared documents
    let first_node = instance(store.clone()).await;
    let second_node = instance(store).await;

    let team = register(&first_node, "Eagles").await;
    admin_service::start_tournament(&first_node).await.unwrap();

    let (first, second) = tokio::join!(
        scan(&first_node, &team, &team.path, 1),
        scan(&second_node, &team, &team.path, 1)
    );
    let outcomes = [first.unwrap(), second.unwrap()];
    let advanced = outcomes
        .iter()
        .filter(|response| response.outcome == ScanOutcomeDto::Advanced)
        .count();
    assert_eq!(advanced, 1);
    let loser = outcomes
        .iter()
        .find(|response| response.outcome == ScanOutcomeDto::Rejected)
        .unwrap();
    assert_eq!(loser.reason.as_deref(), Some("already_completed"));
    assert_eq!(loser.team.current_stage, 1);

    let dashboard = team_service::dashboard(&second_node, team.id, &team.passcode)
        .await
        .unwrap();
    assert_eq!(dashboard.team.current_stage, 1);
    assert_eq!(dashboard.team.score, 20);
}

#[tokio::test]
async fn scans_in_flight_on_one_instance_are_throttled() {
    let state = instance(Arc::new(MemoryHuntStore::new())).await;
    let team = register(&state, "Kites").await;
    admin_service::start_tournament(&state).await.unwrap();

    let _permit = state.throttle().try_acquire(team.id).unwrap();
    let response = scan(&state, &team, &team.path, 1).await.unwrap();
    assert_eq!(response.reason.as_deref(), Some("scan_in_progress"));
    assert_eq!(response.team.current_stage, 0);
}

#[tokio::test]
async fn second_tab_switch_disqualifies_for_good() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Foxes").await;
    admin_service::start_tournament(&state).await.unwrap();

    let report = |event| {
        team_service::report_integrity(&state, team.id, &team.passcode, IntegrityRequest { event })
    };

    let first = report(IntegrityEventDto::TabHidden).await.unwrap();
    assert_eq!(first.verdict, IntegrityVerdictDto::Warned);
    assert_eq!(first.remaining_warnings, Some(0));

    let second = report(IntegrityEventDto::TabHidden).await.unwrap();
    assert_eq!(second.verdict, IntegrityVerdictDto::Disqualified);
    assert!(second.disqualified);

    let third = report(IntegrityEventDto::BackNavigation).await.unwrap();
    assert_eq!(third.verdict, IntegrityVerdictDto::Ignored);
    assert!(third.disqualified);

    let response = scan(&state, &team, &team.path, 1).await.unwrap();
    assert_eq!(response.reason.as_deref(), Some("disqualified"));

    let view = admin_service::disqualify_team(&state, team.id).await.unwrap();
    assert!(view.disqualified);
}

#[tokio::test]
async fn back_navigation_disqualifies_immediately() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Stags").await;
    admin_service::start_tournament(&state).await.unwrap();

    let response = team_service::report_integrity(
        &state,
        team.id,
        &team.passcode,
        IntegrityRequest {
            event: IntegrityEventDto::BackNavigation,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.verdict, IntegrityVerdictDto::Disqualified);
}

#[tokio::test]
async fn wrong_team_passcode_is_unauthorized() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Hares").await;

    let err = team_service::dashboard(&state, team.id, "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}
