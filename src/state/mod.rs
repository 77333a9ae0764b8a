pub mod allocation;
pub mod gatekeeper;
pub mod hunt;
pub mod integrity;
pub mod leaderboard;
pub mod progression;
mod sse;
pub mod state_machine;
pub mod throttle;
pub mod transitions;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::hunt_store::HuntStore,
    error::ServiceError,
    state::{
        state_machine::{TournamentEvent, TournamentPhase, TournamentStateMachine},
        throttle::ScanThrottle,
    },
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::sse::SseState;

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: store handle, configuration, broadcast hubs and lifecycle.
pub struct AppState {
    hunt_store: RwLock<Option<Arc<dyn HuntStore>>>,
    config: Arc<AppConfig>,
    sse: SseState,
    lifecycle: RwLock<TournamentStateMachine>,
    throttle: ScanThrottle,
    degraded: watch::Sender<bool>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Build the shared state. The application starts in degraded mode until a store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let throttle = ScanThrottle::new(config.scan_cooldown());
        Arc::new(Self {
            hunt_store: RwLock::new(None),
            config: Arc::new(config),
            sse: SseState::new(64, 64),
            lifecycle: RwLock::new(TournamentStateMachine::new()),
            throttle,
            degraded: degraded_tx,
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn hunt_store(&self) -> Option<Arc<dyn HuntStore>> {
        self.hunt_store.read().await.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when running without a healthy one.
    pub async fn require_store(&self) -> Result<Arc<dyn HuntStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.hunt_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store and leave degraded mode.
    pub async fn install_hunt_store(&self, store: Arc<dyn HuntStore>) {
        *self.hunt_store.write().await = Some(store);
        self.set_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_hunt_store(&self) {
        self.hunt_store.write().await.take();
        self.set_degraded(true);
    }

    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin()
    }

    pub fn throttle(&self) -> &ScanThrottle {
        &self.throttle
    }

    pub async fn phase(&self) -> TournamentPhase {
        self.lifecycle.read().await.phase()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.lifecycle.read().await.snapshot()
    }

    /// Align the lifecycle with persisted metadata (after a store install or an external change).
    pub async fn reseed_lifecycle(&self, is_started: bool) {
        let phase = TournamentPhase::from_started(is_started);
        if self.lifecycle.write().await.reseed(phase) {
            info!(phase = ?phase, "tournament lifecycle re-seeded from storage");
        }
    }

    /// Update the degraded flag; subscribers are only notified on change.
    pub fn set_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    async fn plan_transition(&self, event: TournamentEvent) -> Result<Plan, PlanError> {
        self.lifecycle.write().await.plan(event)
    }

    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<TournamentPhase, ApplyError> {
        self.lifecycle.write().await.apply(plan_id)
    }

    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        self.lifecycle.write().await.abort(plan_id)
    }

    /// Plan `event`, run `work` (the persistence step) under the transition timeout, then
    /// apply the plan on success or abort it on failure.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: TournamentEvent,
        work: F,
    ) -> Result<(T, TournamentPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let _gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = match self.transition_timeout {
            Some(limit) => timeout(limit, work_future)
                .await
                .unwrap_or(Err(ServiceError::Timeout)),
            None => work_future.await,
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition"
                    );
                }
                Err(err)
            }
        }
    }
}
