use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dto::common::ErrorResponse,
    state::{
        AbortError, ApplyError, PlanError,
        lobby::LobbyError,
        presets::PresetError,
        queue::QueueError,
        roster::RosterError,
        session::SessionError,
        state_machine::{InvalidTransition, SessionEvent},
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Request data failed a domain rule.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Uniqueness rule violated (duplicate identity, already queued, game already running).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Not enough queued players, or the queue is full.
    #[error("insufficient resources: {0}")]
    InsufficientResources(String),
    /// The operation needs a running game.
    #[error("no game session is active")]
    NoActiveSession,
    /// Chat platform or messaging sink failed or timed out.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<RosterError> for ServiceError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::NotFound(_) => ServiceError::NotFound(err.to_string()),
            RosterError::DuplicateChatId(_) | RosterError::ContactTaken { .. } => {
                ServiceError::Conflict(err.to_string())
            }
            RosterError::EmptyField(_) => ServiceError::InvalidInput(err.to_string()),
        }
    }
}

impl From<QueueError> for ServiceError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::AlreadyQueued(_) => ServiceError::Conflict(err.to_string()),
            QueueError::CapacityExceeded { .. } => {
                ServiceError::InsufficientResources(err.to_string())
            }
        }
    }
}

impl From<PresetError> for ServiceError {
    fn from(err: PresetError) -> Self {
        match err {
            PresetError::DuplicateName(_) => ServiceError::Conflict(err.to_string()),
            PresetError::Invalid(_) => ServiceError::InvalidInput(err.to_string()),
            PresetError::NotFound(_) => ServiceError::NotFound(err.to_string()),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyActive => ServiceError::Conflict(err.to_string()),
            SessionError::NoActiveSession => ServiceError::NoActiveSession,
            SessionError::InsufficientQueue { .. } => {
                ServiceError::InsufficientResources(err.to_string())
            }
            SessionError::PlayerCountMismatch { .. } => ServiceError::InvalidInput(err.to_string()),
            SessionError::AssignmentNotFound(_) => ServiceError::NotFound(err.to_string()),
        }
    }
}

impl From<LobbyError> for ServiceError {
    fn from(err: LobbyError) -> Self {
        match err {
            LobbyError::Roster(err) => err.into(),
            LobbyError::Queue(err) => err.into(),
            LobbyError::Preset(err) => err.into(),
            LobbyError::Session(err) => err.into(),
            LobbyError::PlayerInActiveSession(_) => ServiceError::Conflict(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid request.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unknown resource.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Well-formed request that the current lobby cannot satisfy.
    #[error("unprocessable: {0}")]
    UnprocessableEntity(String),
    /// Upstream messaging or chat service failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::InsufficientResources(message) => AppError::UnprocessableEntity(message),
            ServiceError::NoActiveSession => AppError::Conflict("no game session is active".into()),
            ServiceError::TransportFailure(message) => AppError::BadGateway(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorResponse {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("state transition already pending".into())
            }
            PlanError::InvalidTransition(InvalidTransition {
                event: SessionEvent::Start,
                ..
            }) => SessionError::AlreadyActive.into(),
            PlanError::InvalidTransition(InvalidTransition {
                event: SessionEvent::End,
                ..
            }) => ServiceError::NoActiveSession,
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => ServiceError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => ServiceError::InvalidState(format!(
                "state changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidState(format!(
                    "state version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ServiceError::InvalidState("no pending transition".into()),
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidState("transition plan does not match".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(
            status_of(SessionError::AlreadyActive.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                SessionError::InsufficientQueue {
                    required: 3,
                    available: 1
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PresetError::Invalid("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RosterError::NotFound(uuid::Uuid::nil()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::TransportFailure("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_transitions_use_domain_errors() {
        let start = PlanError::InvalidTransition(InvalidTransition {
            from: crate::state::state_machine::SessionPhase::Active,
            event: SessionEvent::Start,
        });
        assert!(matches!(ServiceError::from(start), ServiceError::Conflict(_)));

        let end = PlanError::InvalidTransition(InvalidTransition {
            from: crate::state::state_machine::SessionPhase::Idle,
            event: SessionEvent::End,
        });
        assert!(matches!(ServiceError::from(end), ServiceError::NoActiveSession));
    }

    #[test]
    fn storage_conflicts_stay_conflicts() {
        let err: ServiceError = StorageError::conflict("duplicate").into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
