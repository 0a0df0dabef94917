use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Represents a type that can fetch and store cinepass data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn check_for_admin(&self) -> Result<bool>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn movie_by_id(&self, movie_id: PrimaryKey) -> Result<MovieData>;
    async fn list_movies(&self) -> Result<Vec<MovieData>>;
    async fn create_movie(&self, new_movie: NewMovie) -> Result<MovieData>;
    async fn update_movie(&self, updated_movie: UpdatedMovie) -> Result<MovieData>;
    async fn delete_movie(&self, movie_id: PrimaryKey) -> Result<()>;

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData>;
    async fn booking_by_seat(
        &self,
        movie_id: PrimaryKey,
        party_date: &str,
        seat_number: &str,
    ) -> Result<BookingData>;
    async fn list_bookings(&self) -> Result<Vec<BookingData>>;
    async fn list_bookings_by_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>>;
    async fn booked_seats(&self, movie_id: PrimaryKey, party_date: &str) -> Result<Vec<String>>;
    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData>;
    async fn update_booking(&self, updated_booking: UpdatedBooking) -> Result<BookingData>;
    async fn delete_booking(&self, booking_id: PrimaryKey) -> Result<()>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub is_admin: bool,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub poster_path: Option<String>,
    pub film_type: String,
    pub duration_minutes: i32,
}

#[derive(Debug)]
pub struct UpdatedMovie {
    pub id: PrimaryKey,
    pub title: String,
    pub description: String,
    /// Keeps the existing poster when omitted
    pub poster_path: Option<String>,
    pub film_type: String,
    pub duration_minutes: i32,
}

#[derive(Debug)]
pub struct NewBooking {
    pub user_id: PrimaryKey,
    pub movie_id: PrimaryKey,
    pub seat_number: String,
    pub party_date: String,
    pub party_number: i32,
    pub price: f64,
    pub extras: serde_json::Value,
}

#[derive(Debug)]
pub struct UpdatedBooking {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub movie_id: PrimaryKey,
    pub seat_number: String,
    pub party_date: String,
    pub party_number: i32,
    pub price: f64,
    /// Keeps the existing extras when omitted
    pub extras: Option<serde_json::Value>,
}
