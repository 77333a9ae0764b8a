mod common;

use std::{
    collections::HashMap,
    time::{Duration, SystemTime},
};

use quest_trail_back::{
    config::AppConfig,
    dao::hunt_store::HuntStore,
    dto::{admin::RegisterTeamRequest, team::LoginRequest},
    error::ServiceError,
    services::{admin_service, public_service, team_service, tournament_service},
    state::{
        AppState,
        hunt::{Team, TournamentMetadata},
        state_machine::TournamentPhase,
    },
};

use common::{ready_state, register, scan};

#[tokio::test]
async fn registration_balances_houses_and_paths() {
    let (state, _store) = ready_state().await;
    for idx in 0..12 {
        register(&state, &format!("Team {idx}")).await;
    }

    let teams = admin_service::list_teams(&state).await.unwrap();
    let mut houses: HashMap<String, usize> = HashMap::new();
    let mut paths: HashMap<String, usize> = HashMap::new();
    for team in &teams {
        *houses.entry(team.house.clone()).or_default() += 1;
        *paths.entry(team.path.clone()).or_default() += 1;
        assert_eq!(team.current_stage, 0);
        assert_eq!(team.score, 0);
    }

    assert_eq!(houses.len(), 4);
    assert!(houses.values().all(|count| *count == 3));
    assert_eq!(paths.len(), 3);
    assert!(paths.values().all(|count| *count == 4));
}

#[tokio::test]
async fn team_names_are_unique_per_session() {
    let (state, _store) = ready_state().await;
    register(&state, "Phoenix").await;

    let err = admin_service::register_team(
        &state,
        RegisterTeamRequest {
            name: "  phoenix ".into(),
            leader: "Someone".into(),
            passcode: "other".into(),
            round2_secret: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn starting_twice_is_a_conflict() {
    let (state, _store) = ready_state().await;
    let status = admin_service::start_tournament(&state).await.unwrap();
    assert!(status.is_started);
    assert!(status.start_time.is_some());
    assert_eq!(state.phase().await, TournamentPhase::Running);

    let err = admin_service::start_tournament(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
    assert_eq!(state.phase().await, TournamentPhase::Running);
}

#[tokio::test]
async fn lifecycle_follows_changes_made_by_another_instance() {
    let (first_node, store) = ready_state().await;
    let second_node = AppState::new(AppConfig::default());
    second_node.install_hunt_store(store).await;

    admin_service::start_tournament(&first_node).await.unwrap();
    let status = admin_service::reset_tournament(&second_node).await.unwrap();
    assert!(!status.is_started);

    let status = admin_service::start_tournament(&first_node).await.unwrap();
    assert!(status.is_started);
    assert_eq!(first_node.phase().await, TournamentPhase::Running);
}

#[tokio::test]
async fn reset_scopes_out_previous_teams() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Wolves").await;
    admin_service::start_tournament(&state).await.unwrap();
    scan(&state, &team, &team.path, 1).await.unwrap();

    let status = admin_service::reset_tournament(&state).await.unwrap();
    assert!(!status.is_started);
    assert_eq!(status.team_count, 0);
    assert_ne!(status.active_tournament_id, team.tournament_id);
    assert_eq!(state.phase().await, TournamentPhase::Registration);

    assert!(admin_service::list_teams(&state).await.unwrap().is_empty());
    let err = team_service::dashboard(&state, team.id, &team.passcode)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // the name is free again in the new session
    let again = register(&state, "Wolves").await;
    assert_ne!(again.id, team.id);
}

#[tokio::test]
async fn login_returns_the_session_object() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Otters").await;

    let session = team_service::login(
        &state,
        LoginRequest {
            name: "otters".into(),
            passcode: team.passcode.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(session.team_id, team.id);
    assert_eq!(session.path, team.path);

    let err = team_service::login(
        &state,
        LoginRequest {
            name: "Otters".into(),
            passcode: "wrong".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn dashboard_shows_clue_and_secret_fragments() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Moles").await;

    let waiting = team_service::dashboard(&state, team.id, &team.passcode)
        .await
        .unwrap();
    assert_eq!(waiting.current_clue, "Wait for the next instruction...");
    assert_eq!(waiting.secret_fragments.as_deref(), Some("________"));

    admin_service::start_tournament(&state).await.unwrap();
    scan(&state, &team, &team.path, 1).await.unwrap();

    let dashboard = team_service::dashboard(&state, team.id, &team.passcode)
        .await
        .unwrap();
    let expected_clue = state.config().clue(&team.path, 2).unwrap();
    assert_eq!(dashboard.current_clue, expected_clue);
    assert_eq!(dashboard.secret_fragments.as_deref(), Some("AB______"));
    assert!(dashboard.tournament_started);
}

#[tokio::test]
async fn leaderboard_orders_by_stage_then_score() {
    let (state, _store) = ready_state().await;
    let leader = register(&state, "Leader").await;
    let runner_up = register(&state, "Runner").await;
    let idle = register(&state, "Idle").await;
    admin_service::start_tournament(&state).await.unwrap();

    scan(&state, &leader, &leader.path, 1).await.unwrap();
    scan(&state, &leader, &leader.path, 2).await.unwrap();
    scan(&state, &runner_up, &runner_up.path, 1).await.unwrap();

    let board = public_service::leaderboard(&state).await.unwrap();
    let names: Vec<&str> = board.rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["Leader", "Runner", "Idle"]);
    assert_eq!(board.rows[2].team_id, idle.id);
    assert_eq!(
        board.rows.iter().map(|row| row.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn late_joiners_start_their_own_clock() {
    let (state, store) = ready_state().await;
    let now = SystemTime::now();
    let hour_ago = now - Duration::from_secs(3_600);

    let mut metadata = TournamentMetadata::fresh(hour_ago);
    metadata.is_started = true;
    metadata.start_time = Some(hour_ago);
    store
        .save_metadata(metadata.clone().into(), None)
        .await
        .unwrap();
    tournament_service::sync_lifecycle(&state).await.unwrap();

    let early = Team::register(
        metadata.active_tournament_id,
        "Early".into(),
        "E".into(),
        "early-pass".into(),
        None,
        "Gryffindor".into(),
        "alpha".into(),
        now - Duration::from_secs(7_200),
    );
    store.insert_team(early.clone().into()).await.unwrap();
    let late = register(&state, "Late").await;

    let early_view = team_service::dashboard(&state, early.id, "early-pass")
        .await
        .unwrap();
    let late_view = team_service::dashboard(&state, late.id, &late.passcode)
        .await
        .unwrap();

    assert!(early_view.elapsed_ms >= 3_600_000);
    assert!(late_view.elapsed_ms < 60_000);
}

#[tokio::test]
async fn services_report_degraded_mode_without_store() {
    let state = AppState::new(AppConfig::default());
    let err = public_service::leaderboard(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));

    let err = admin_service::start_tournament(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
    assert_eq!(state.phase().await, TournamentPhase::Registration);
}

#[tokio::test]
async fn progress_is_pushed_to_the_public_stream() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Crows").await;
    admin_service::start_tournament(&state).await.unwrap();

    let mut public = state.public_sse().subscribe();
    scan(&state, &team, &team.path, 1).await.unwrap();

    let progressed = public.recv().await.unwrap();
    assert_eq!(progressed.event.as_deref(), Some("team.progressed"));
    assert!(progressed.data.contains("\"advanced\""));
    assert!(!progressed.data.contains(&team.passcode));

    let board = public.recv().await.unwrap();
    assert_eq!(board.event.as_deref(), Some("leaderboard"));
}
