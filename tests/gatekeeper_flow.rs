mod common;

use quest_trail_back::{
    dto::{
        admin::AdminTeamView,
        team::{GateOutcomeDto, GatekeeperRequest, GatekeeperResponse},
    },
    error::ServiceError,
    services::{admin_service, team_service},
    state::SharedState,
};

use common::{ready_state, register, scan};

async fn finish_path(state: &SharedState, team: &AdminTeamView) {
    for stage in 1..=state.config().total_stages() {
        scan(state, team, &team.path, stage).await.unwrap();
    }
}

async fn answer(
    state: &SharedState,
    team: &AdminTeamView,
    answer: &str,
) -> Result<GatekeeperResponse, ServiceError> {
    team_service::gatekeeper(
        state,
        team.id,
        &team.passcode,
        GatekeeperRequest {
            answer: answer.to_string(),
        },
    )
    .await
}

#[tokio::test]
async fn correct_secret_opens_the_gate_once() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Griffins").await;
    admin_service::start_tournament(&state).await.unwrap();
    finish_path(&state, &team).await;

    let mut public = state.public_sse().subscribe();
    let opened = answer(&state, &team, "abcdefgh").await.unwrap();
    assert_eq!(opened.outcome, GateOutcomeDto::Unlocked);
    assert!(opened.team.gate_unlocked_at.is_some());

    let event = public.recv().await.unwrap();
    assert_eq!(event.event.as_deref(), Some("team.gate_unlocked"));
    assert!(!event.data.contains(&team.passcode));

    let again = answer(&state, &team, "ABCDEFGH").await.unwrap();
    assert_eq!(again.outcome, GateOutcomeDto::AlreadyUnlocked);
    assert_eq!(again.team.gate_unlocked_at, opened.team.gate_unlocked_at);

    let teams = admin_service::list_teams(&state).await.unwrap();
    assert_eq!(teams[0].gate_unlocked_at, opened.team.gate_unlocked_at);
}

#[tokio::test]
async fn wrong_secret_keeps_the_gate_shut() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Hippogriffs").await;
    admin_service::start_tournament(&state).await.unwrap();
    finish_path(&state, &team).await;

    let response = answer(&state, &team, "ABCDEFGX").await.unwrap();
    assert_eq!(response.outcome, GateOutcomeDto::Refused);
    assert_eq!(response.reason.as_deref(), Some("wrong_answer"));
    assert!(response.team.gate_unlocked_at.is_none());
    assert_eq!(response.team.score, 100);
}

#[tokio::test]
async fn gate_is_closed_before_the_last_stage() {
    let (state, _store) = ready_state().await;
    let team = register(&state, "Thestrals").await;
    admin_service::start_tournament(&state).await.unwrap();
    for stage in 1..state.config().total_stages() {
        scan(&state, &team, &team.path, stage).await.unwrap();
    }

    let response = answer(&state, &team, "ABCDEFGH").await.unwrap();
    assert_eq!(response.outcome, GateOutcomeDto::Refused);
    assert_eq!(response.reason.as_deref(), Some("not_finished"));
    assert!(response.team.gate_unlocked_at.is_none());
}
