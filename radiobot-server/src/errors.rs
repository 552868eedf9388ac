use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use radiobot_radio::{ControlError, DatabaseError};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<ControlError> for ServerError {
    fn from(value: ControlError) -> Self {
        match value {
            ControlError::NoRadio => Self::NotFound {
                resource: "radio",
                identifier: "guild_id",
            },
            ControlError::NoSession => Self::NotFound {
                resource: "session",
                identifier: "guild_id",
            },
            ControlError::StationNotFound => Self::NotFound {
                resource: "station",
                identifier: "station_name",
            },
            e @ (ControlError::NotStationOwner(_) | ControlError::MissingManagingRole) => {
                Self::Forbidden(e.to_string())
            }
            ControlError::InvalidVolume(e) => Self::BadRequest(e.to_string()),
            ControlError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use radiobot_core::VolumeError;

    use super::*;

    #[test]
    fn control_errors_map_to_statuses() {
        let cases = [
            (ControlError::NoRadio, StatusCode::NOT_FOUND),
            (ControlError::NoSession, StatusCode::NOT_FOUND),
            (ControlError::StationNotFound, StatusCode::NOT_FOUND),
            (
                ControlError::NotStationOwner("Lofi".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (ControlError::MissingManagingRole, StatusCode::FORBIDDEN),
            (
                ControlError::InvalidVolume(VolumeError::OutOfRange(0)),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ServerError::from(error).as_status_code(), status);
        }
    }
}
