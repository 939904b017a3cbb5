use serde::Serialize;
use utoipa::ToSchema;

/// Liveness payload returned by `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" while storage is reachable, "degraded" otherwise.
    pub status: String,
    /// Mirrors `status == "degraded"`.
    pub degraded: bool,
}

impl HealthResponse {
    /// Storage is reachable.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            degraded: false,
        }
    }

    /// Storage is unreachable; lobby writes are refused.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            degraded: true,
        }
    }
}
