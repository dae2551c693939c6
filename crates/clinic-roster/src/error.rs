use crate::config::ConfigError;
use crate::staffing::evaluation::EvaluationError;
use crate::staffing::hierarchy::HierarchyError;
use crate::staffing::identity::IdentityError;
use crate::staffing::leave::LeaveError;
use crate::staffing::store::StoreError;
use crate::staffing::transition::TransitionError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Leave(LeaveError),
    Transition(TransitionError),
    Evaluation(EvaluationError),
    Identity(IdentityError),
    Store(StoreError),
    Hierarchy(HierarchyError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Leave(err) => write!(f, "leave error: {}", err),
            AppError::Transition(err) => write!(f, "rank transition error: {}", err),
            AppError::Evaluation(err) => write!(f, "evaluation error: {}", err),
            AppError::Identity(err) => write!(f, "identity error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Hierarchy(err) => write!(f, "tier table error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Leave(err) => Some(err),
            AppError::Transition(err) => Some(err),
            AppError::Evaluation(err) => Some(err),
            AppError::Identity(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Hierarchy(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Leave(err) => match err {
                LeaveError::AlreadyOnLeave | LeaveError::CooldownActive { .. } => {
                    StatusCode::CONFLICT
                }
                LeaveError::NotOnLeave | LeaveError::NotStaff => StatusCode::NOT_FOUND,
                LeaveError::TooShort { .. }
                | LeaveError::EndsInPast
                | LeaveError::ManualDuration => StatusCode::BAD_REQUEST,
                LeaveError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Transition(err) => match err {
                TransitionError::UnknownRankCode(_) | TransitionError::SameTier => {
                    StatusCode::BAD_REQUEST
                }
                TransitionError::OnLeave => StatusCode::CONFLICT,
                TransitionError::Ranking(_) => StatusCode::BAD_GATEWAY,
                TransitionError::Hierarchy(_) | TransitionError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Evaluation(err) => match err {
                EvaluationError::NotStaff => StatusCode::NOT_FOUND,
                EvaluationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Identity(err) => match err {
                IdentityError::Unresolved(_) => StatusCode::NOT_FOUND,
                IdentityError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Store(_)
            | AppError::Hierarchy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<LeaveError> for AppError {
    fn from(value: LeaveError) -> Self {
        Self::Leave(value)
    }
}

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

impl From<EvaluationError> for AppError {
    fn from(value: EvaluationError) -> Self {
        Self::Evaluation(value)
    }
}

impl From<IdentityError> for AppError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<HierarchyError> for AppError {
    fn from(value: HierarchyError) -> Self {
        Self::Hierarchy(value)
    }
}
