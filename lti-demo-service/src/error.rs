use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("State ID missing.")]
    MissingStateId,

    #[error("State store unavailable: {message}")]
    StateStoreUnavailable { message: String },

    #[error("State missing. {state_id}")]
    StateNotFound { state_id: String },

    #[error("Wrong type of state. {kind}")]
    WrongStateKind { kind: &'static str },

    #[error("Wrong type of LtiState.")]
    WrongLaunchStateKind,

    #[error("Could not find data about the requested resource.")]
    LaunchDataNotFound,

    #[error("Unknown platform: {issuer}")]
    UnknownPlatform { issuer: String },

    #[error("Invalid launch: {message}")]
    InvalidLaunch { message: String },

    #[error("Not allowed to {action} this resource")]
    Forbidden { action: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UnknownPlatform { .. }
            | ServiceError::InvalidLaunch { .. }
            | ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::MissingStateId => "missing_state_id",
            ServiceError::StateStoreUnavailable { .. } => "state_store_unavailable",
            ServiceError::StateNotFound { .. } => "state_not_found",
            ServiceError::WrongStateKind { .. } => "wrong_state_kind",
            ServiceError::WrongLaunchStateKind => "wrong_launch_state_kind",
            ServiceError::LaunchDataNotFound => "launch_data_not_found",
            ServiceError::UnknownPlatform { .. } => "unknown_platform",
            ServiceError::InvalidLaunch { .. } => "invalid_launch",
            ServiceError::Forbidden { .. } => "forbidden",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Database(_) => "database_error",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                code = self.error_code(),
                error = %format_error_chain(&self),
                "Request failed"
            );
        } else {
            tracing::warn!(code = self.error_code(), error = %self, "Request rejected");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain;charset=UTF-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error and its sources as a single line, outermost first
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
