//! All schemas accepted by endpoints are defined here, along with the
//! extractor that validates them

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewBookingSchema {
    pub movie_id: i32,
    pub user_id: i32,
    #[validate(length(min = 1, max = 8))]
    pub seat_number: String,
    /// The date of the showing, as `YYYY-MM-DD`
    #[validate(length(min = 10, max = 10))]
    pub party_date: String,
    #[validate(range(min = 1))]
    pub party_number: i32,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[schema(value_type = Option<Object>)]
    pub extras: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatedBookingSchema {
    pub movie_id: i32,
    pub user_id: i32,
    #[validate(length(min = 1, max = 8))]
    pub seat_number: String,
    #[validate(length(min = 10, max = 10))]
    pub party_date: String,
    #[validate(range(min = 1))]
    pub party_number: i32,
    #[validate(range(min = 0.0))]
    pub price: f64,
    /// Keeps the existing extras when omitted
    #[schema(value_type = Option<Object>)]
    pub extras: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewMovieSchema {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: String,
    pub poster_path: Option<String>,
    #[validate(length(min = 1))]
    pub film_type: String,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatedMovieSchema {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: String,
    /// Keeps the existing poster when omitted
    pub poster_path: Option<String>,
    #[validate(length(min = 1))]
    pub film_type: String,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| ServerError::MalformedJson)?;

        extracted_json
            .0
            .validate()
            .map_err(|_| ServerError::Validation)?;

        Ok(Self(extracted_json.0))
    }
}
