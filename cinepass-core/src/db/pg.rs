use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, prelude::FromRow, Error as SqlxError, PgPool};

use crate::{
    BookingData, Database, DatabaseError, IntoDatabaseError, MovieData, NewBooking, NewMovie,
    NewSession, NewUser, PrimaryKey, Result, SessionData, UpdatedBooking, UpdatedMovie, UserData,
};

/// A postgres database implementation for cinepass
pub struct PgDatabase {
    pool: PgPool,
}

const BOOKING_QUERY: &str = "
    SELECT
        bookings.id,
        bookings.seat_number,
        bookings.party_date,
        bookings.party_number,
        bookings.price,
        bookings.extras,
        bookings.created_at,
        users.id AS user_id,
        users.username,
        users.password,
        users.display_name,
        users.is_admin,
        movies.id AS movie_id,
        movies.title,
        movies.description,
        movies.poster_path,
        movies.film_type,
        movies.duration_minutes
    FROM bookings
        INNER JOIN users ON bookings.user_id = users.id
        INNER JOIN movies ON bookings.movie_id = movies.id";

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    password: String,
    display_name: String,
    is_admin: bool,
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    username: String,
    password: String,
    display_name: String,
    is_admin: bool,
}

#[derive(Debug, FromRow)]
struct MovieRow {
    id: PrimaryKey,
    title: String,
    description: String,
    poster_path: Option<String>,
    film_type: String,
    duration_minutes: i32,
}

#[derive(Debug, FromRow)]
struct BookingRow {
    id: PrimaryKey,
    seat_number: String,
    party_date: String,
    party_number: i32,
    price: f64,
    extras: serde_json::Value,
    created_at: DateTime<Utc>,
    user_id: PrimaryKey,
    username: String,
    password: String,
    display_name: String,
    is_admin: bool,
    movie_id: PrimaryKey,
    title: String,
    description: String,
    poster_path: Option<String>,
    film_type: String,
    duration_minutes: i32,
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password: row.password,
            display_name: row.display_name,
            is_admin: row.is_admin,
        }
    }
}

impl From<SessionRow> for SessionData {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            user: UserData {
                id: row.user_id,
                username: row.username,
                password: row.password,
                display_name: row.display_name,
                is_admin: row.is_admin,
            },
        }
    }
}

impl From<MovieRow> for MovieData {
    fn from(row: MovieRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            poster_path: row.poster_path,
            film_type: row.film_type,
            duration_minutes: row.duration_minutes,
        }
    }
}

impl From<BookingRow> for BookingData {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            seat_number: row.seat_number,
            party_date: row.party_date,
            party_number: row.party_number,
            price: row.price,
            extras: row.extras,
            created_at: row.created_at,
            user: UserData {
                id: row.user_id,
                username: row.username,
                password: row.password,
                display_name: row.display_name,
                is_admin: row.is_admin,
            },
            movie: MovieData {
                id: row.movie_id,
                title: row.title,
                description: row.description,
                poster_path: row.poster_path,
                film_type: row.film_type,
                duration_minutes: row.duration_minutes,
            },
        }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        let result = sqlx::query("SELECT id FROM users WHERE is_admin = true")
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => match e {
                SqlxError::RowNotFound => Ok(false),
                e => Err(e.any()),
            },
        }
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "username"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password, display_name, is_admin)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| conflict_on_unique(e, "user", "username", &new_user.username))
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT
                sessions.id,
                sessions.token,
                users.id AS user_id,
                users.username,
                users.password,
                users.display_name,
                users.is_admin
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&new_session.token)
        .bind(new_session.user_id)
        .bind(new_session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }

    async fn movie_by_id(&self, movie_id: PrimaryKey) -> Result<MovieData> {
        sqlx::query_as::<_, MovieRow>("SELECT * FROM movies WHERE id = $1")
            .bind(movie_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("movie", "id"))
    }

    async fn list_movies(&self) -> Result<Vec<MovieData>> {
        let rows = sqlx::query_as::<_, MovieRow>("SELECT * FROM movies ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_movie(&self, new_movie: NewMovie) -> Result<MovieData> {
        sqlx::query_as::<_, MovieRow>(
            "INSERT INTO movies (title, description, poster_path, film_type, duration_minutes)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&new_movie.title)
        .bind(&new_movie.description)
        .bind(&new_movie.poster_path)
        .bind(&new_movie.film_type)
        .bind(new_movie.duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_movie(&self, updated_movie: UpdatedMovie) -> Result<MovieData> {
        let movie = self.movie_by_id(updated_movie.id).await?;

        sqlx::query_as::<_, MovieRow>(
            "UPDATE movies
             SET title = $1, description = $2, poster_path = $3, film_type = $4, duration_minutes = $5
             WHERE id = $6 RETURNING *",
        )
        .bind(&updated_movie.title)
        .bind(&updated_movie.description)
        .bind(updated_movie.poster_path.or(movie.poster_path))
        .bind(&updated_movie.film_type)
        .bind(updated_movie.duration_minutes)
        .bind(updated_movie.id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn delete_movie(&self, movie_id: PrimaryKey) -> Result<()> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(movie_id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_restrict(e, "movie", "bookings", movie_id))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "movie",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let query = format!("{} WHERE bookings.id = $1", BOOKING_QUERY);

        sqlx::query_as::<_, BookingRow>(&query)
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("booking", "id"))
    }

    async fn booking_by_seat(
        &self,
        movie_id: PrimaryKey,
        party_date: &str,
        seat_number: &str,
    ) -> Result<BookingData> {
        let query = format!(
            "{} WHERE bookings.movie_id = $1 AND bookings.party_date = $2 AND bookings.seat_number = $3",
            BOOKING_QUERY
        );

        sqlx::query_as::<_, BookingRow>(&query)
            .bind(movie_id)
            .bind(party_date)
            .bind(seat_number)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("booking", "seat_number"))
    }

    async fn list_bookings(&self) -> Result<Vec<BookingData>> {
        let query = format!("{} ORDER BY bookings.id", BOOKING_QUERY);

        let rows = sqlx::query_as::<_, BookingRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_bookings_by_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let query = format!(
            "{} WHERE bookings.user_id = $1 ORDER BY bookings.id",
            BOOKING_QUERY
        );

        let rows = sqlx::query_as::<_, BookingRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn booked_seats(&self, movie_id: PrimaryKey, party_date: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT seat_number FROM bookings WHERE movie_id = $1 AND party_date = $2",
        )
        .bind(movie_id)
        .bind(party_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(|(seat,)| seat).collect())
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let inserted: (PrimaryKey,) = sqlx::query_as(
            "INSERT INTO bookings (user_id, movie_id, seat_number, party_date, party_number, price, extras)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(new_booking.user_id)
        .bind(new_booking.movie_id)
        .bind(&new_booking.seat_number)
        .bind(&new_booking.party_date)
        .bind(new_booking.party_number)
        .bind(new_booking.price)
        .bind(&new_booking.extras)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "booking", "seat_number", &new_booking.seat_number))?;

        self.booking_by_id(inserted.0).await
    }

    async fn update_booking(&self, updated_booking: UpdatedBooking) -> Result<BookingData> {
        let booking = self.booking_by_id(updated_booking.id).await?;

        sqlx::query(
            "UPDATE bookings
             SET user_id = $1, movie_id = $2, seat_number = $3, party_date = $4,
                 party_number = $5, price = $6, extras = $7
             WHERE id = $8",
        )
        .bind(updated_booking.user_id)
        .bind(updated_booking.movie_id)
        .bind(&updated_booking.seat_number)
        .bind(&updated_booking.party_date)
        .bind(updated_booking.party_number)
        .bind(updated_booking.price)
        .bind(updated_booking.extras.unwrap_or(booking.extras))
        .bind(updated_booking.id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "booking", "seat_number", &updated_booking.seat_number))?;

        self.booking_by_id(updated_booking.id).await
    }

    async fn delete_booking(&self, booking_id: PrimaryKey) -> Result<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            });
        }

        Ok(())
    }
}

impl IntoDatabaseError for SqlxError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => DatabaseError::Internal(Box::new(e)),
        }
    }

    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

/// Maps a unique index violation to [DatabaseError::Conflict]
fn conflict_on_unique(
    error: SqlxError,
    resource: &'static str,
    field: &'static str,
    value: &str,
) -> DatabaseError {
    if let SqlxError::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            };
        }
    }

    error.any()
}

/// Maps a foreign key violation to [DatabaseError::Conflict], for deletes
/// that are blocked by referencing rows
fn conflict_on_restrict(
    error: SqlxError,
    resource: &'static str,
    field: &'static str,
    id: PrimaryKey,
) -> DatabaseError {
    if let SqlxError::Database(db_error) = &error {
        if db_error.is_foreign_key_violation() {
            return DatabaseError::Conflict {
                resource,
                field,
                value: id.to_string(),
            };
        }
    }

    error.any()
}
