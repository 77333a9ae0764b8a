use crate::{
    error::ServiceError,
    services::sse_events::broadcast_lifecycle,
    state::{SharedState, hunt::TournamentMetadata, state_machine::TournamentEvent},
};

/// Execute a planned lifecycle transition, then broadcast the new tournament status.
pub async fn run_transition_with_broadcast<F, Fut>(
    state: &SharedState,
    event: TournamentEvent,
    work: F,
) -> Result<TournamentMetadata, ServiceError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<TournamentMetadata, ServiceError>>,
{
    let (metadata, next) = state.run_transition(event, work).await?;
    broadcast_lifecycle(state, event, next, &metadata);
    Ok(metadata)
}
