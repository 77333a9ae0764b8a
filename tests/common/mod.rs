#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use quest_trail_back::{
    config::AppConfig,
    dao::hunt_store::memory::MemoryHuntStore,
    dto::{
        admin::{AdminTeamView, RegisterTeamRequest},
        team::{ScanRequest, ScanResponse},
    },
    error::ServiceError,
    services::{admin_service, team_service},
    state::{AppState, SharedState, hunt::QrPayload},
};

pub const PATHS: [&str; 3] = ["alpha", "beta", "gamma"];

/// State backed by a fresh memory store, without scan cooldown.
pub async fn ready_state() -> (SharedState, Arc<MemoryHuntStore>) {
    let config = AppConfig::default().with_scan_cooldown(Duration::ZERO);
    let state = AppState::new(config);
    let store = Arc::new(MemoryHuntStore::new());
    state.install_hunt_store(store.clone()).await;
    (state, store)
}

pub async fn register(state: &SharedState, name: &str) -> AdminTeamView {
    admin_service::register_team(
        state,
        RegisterTeamRequest {
            name: name.to_string(),
            leader: format!("{name} leader"),
            passcode: format!("{name}-pass"),
            round2_secret: Some("ABCDEFGH".to_string()),
        },
    )
    .await
    .expect("registration succeeds")
}

pub fn payload(path_id: &str, stage: u32) -> String {
    QrPayload {
        path_id: path_id.to_string(),
        stage,
    }
    .encode()
}

pub async fn scan(
    state: &SharedState,
    team: &AdminTeamView,
    path_id: &str,
    stage: u32,
) -> Result<ScanResponse, ServiceError> {
    team_service::scan(
        state,
        team.id,
        &team.passcode,
        ScanRequest {
            raw: payload(path_id, stage),
            observed_stage: None,
        },
    )
    .await
}

pub fn other_path(path: &str) -> &'static str {
    PATHS
        .into_iter()
        .find(|candidate| *candidate != path)
        .expect("at least two paths configured")
}
