use chrono::{DateTime, Utc};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A cinepass account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub password: String,
    pub display_name: String,
    /// Admins manage the movie catalog and can act on any booking
    pub is_admin: bool,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserData,
}

/// A movie in the catalog
#[derive(Debug, Clone)]
pub struct MovieData {
    pub id: PrimaryKey,
    pub title: String,
    pub description: String,
    /// Where the poster image is stored, if one was uploaded
    pub poster_path: Option<String>,
    pub film_type: String,
    pub duration_minutes: i32,
}

/// A reserved seat for a showing of a movie on a specific date.
/// Note: `movie_id`, `party_date`, and `seat_number` are unique together.
#[derive(Debug, Clone)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub seat_number: String,
    /// The date of the showing, as `YYYY-MM-DD`
    pub party_date: String,
    pub party_number: i32,
    /// Accepted as given from the client, no server-side pricing
    pub price: f64,
    pub extras: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// The user that owns this booking
    pub user: UserData,
    /// The movie this booking is for
    pub movie: MovieData,
}
