use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    /// Whether the last store ping succeeded.
    pub storage_reachable: bool,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            storage_reachable: true,
        }
    }

    pub fn degraded(storage_reachable: bool) -> Self {
        Self {
            status: "degraded".to_string(),
            storage_reachable,
        }
    }
}
