use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use cinepass_core::{AuthError, BookingError, DatabaseError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Unauthorized")]
    NotOwner,
    #[error("Unauthorized. Admin access required.")]
    AdminRequired,
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("Seat is already booked")]
    SeatTaken { seat_number: String },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An admin user already exists")]
    AdminExists,
    #[error("JSON parse failed")]
    MalformedJson,
    #[error("Request body is invalid")]
    Validation,
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotOwner => StatusCode::FORBIDDEN,
            Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::NotFound { resource: _ } => StatusCode::NOT_FOUND,
            Self::SeatTaken { seat_number: _ } => StatusCode::CONFLICT,
            Self::Conflict {
                resource: _,
                field: _,
                value: _,
            } => StatusCode::CONFLICT,
            Self::AdminExists => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::MalformedJson => StatusCode::BAD_REQUEST,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The extra `error` field of the response body, for errors that carry
    /// a longer explanation
    fn detail(&self) -> Option<String> {
        match self {
            Self::Unauthenticated => Some("You must be logged in to do this".to_string()),
            Self::NotOwner => Some("You can only manage your own bookings".to_string()),
            Self::SeatTaken { seat_number } => Some(format!(
                "Seat {} is already reserved for the selected show",
                seat_number
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        let mut body = serde_json::Map::new();
        body.insert("message".to_string(), self.to_string().into());

        if let Some(detail) = self.detail() {
            body.insert("error".to_string(), detail.into());
        }

        (status, Json(serde_json::Value::Object(body))).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier: _,
            } => Self::NotFound { resource },
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

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::AdminExists => Self::AdminExists,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BookingError> for ServerError {
    fn from(value: BookingError) -> Self {
        match value {
            BookingError::SeatTaken { seat_number } => Self::SeatTaken { seat_number },
            BookingError::NotOwner => Self::NotOwner,
            BookingError::Db(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_codes_follow_the_taxonomy() {
        assert_eq!(
            ServerError::Unauthenticated.as_status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServerError::NotOwner.as_status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServerError::AdminRequired.as_status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServerError::NotFound { resource: "booking" }.as_status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::SeatTaken {
                seat_number: "A1".to_string()
            }
            .as_status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::Validation.as_status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_storage_conflict_becomes_seat_taken() {
        // A unique index violation from the store must surface as 409,
        // never as an internal error
        let error: ServerError = BookingError::SeatTaken {
            seat_number: "A1".to_string(),
        }
        .into();

        assert_eq!(error.as_status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_maps_through_from_the_store() {
        let error: ServerError = DatabaseError::NotFound {
            resource: "booking",
            identifier: "id",
        }
        .into();

        assert_eq!(error.as_status_code(), StatusCode::NOT_FOUND);
    }
}
