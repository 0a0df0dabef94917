use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use async_trait::async_trait;

use crate::{
    BookingData, Database, DatabaseError, MovieData, NewBooking, NewMovie, NewSession, NewUser,
    PrimaryKey, Result, SessionData, UpdatedBooking, UpdatedMovie, UserData,
};

/// An in-memory database implementation, used in tests and local development.
/// All operations happen under a single lock, so it upholds the same seat
/// uniqueness guarantee as the unique index in postgres.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: PrimaryKey,
    users: Vec<UserData>,
    sessions: Vec<StoredSession>,
    movies: Vec<MovieData>,
    bookings: Vec<StoredBooking>,
}

struct StoredSession {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct StoredBooking {
    id: PrimaryKey,
    user_id: PrimaryKey,
    movie_id: PrimaryKey,
    seat_number: String,
    party_date: String,
    party_number: i32,
    price: f64,
    extras: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn assign_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn movie(&self, movie_id: PrimaryKey) -> Result<MovieData> {
        self.movies
            .iter()
            .find(|m| m.id == movie_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "movie",
                identifier: "id",
            })
    }

    fn expand(&self, booking: &StoredBooking) -> Result<BookingData> {
        Ok(BookingData {
            id: booking.id,
            seat_number: booking.seat_number.clone(),
            party_date: booking.party_date.clone(),
            party_number: booking.party_number,
            price: booking.price,
            extras: booking.extras.clone(),
            created_at: booking.created_at,
            user: self.user(booking.user_id)?,
            movie: self.movie(booking.movie_id)?,
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        Ok(self.state.lock().users.iter().any(|u| u.is_admin))
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state.lock().user(user_id)
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        self.state
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.lock();

        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        let user = UserData {
            id: state.assign_id(),
            username: new_user.username,
            password: new_user.password,
            display_name: new_user.display_name,
            is_admin: new_user.is_admin,
        };

        state.users.push(user.clone());
        Ok(user)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let state = self.state.lock();

        let session = state
            .sessions
            .iter()
            .find(|s| s.token == token && s.expires_at > Utc::now())
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(SessionData {
            id: session.id,
            token: session.token.clone(),
            user: state.user(session.user_id)?,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut state = self.state.lock();
        let user = state.user(new_session.user_id)?;

        let session = StoredSession {
            id: state.assign_id(),
            token: new_session.token,
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        };

        let data = SessionData {
            id: session.id,
            token: session.token.clone(),
            user,
        };

        state.sessions.push(session);
        Ok(data)
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        self.state.lock().sessions.retain(|s| s.token != token);
        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        self.state
            .lock()
            .sessions
            .retain(|s| s.expires_at > Utc::now());

        Ok(())
    }

    async fn movie_by_id(&self, movie_id: PrimaryKey) -> Result<MovieData> {
        self.state.lock().movie(movie_id)
    }

    async fn list_movies(&self) -> Result<Vec<MovieData>> {
        let mut movies = self.state.lock().movies.clone();
        movies.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(movies)
    }

    async fn create_movie(&self, new_movie: NewMovie) -> Result<MovieData> {
        let mut state = self.state.lock();

        let movie = MovieData {
            id: state.assign_id(),
            title: new_movie.title,
            description: new_movie.description,
            poster_path: new_movie.poster_path,
            film_type: new_movie.film_type,
            duration_minutes: new_movie.duration_minutes,
        };

        state.movies.push(movie.clone());
        Ok(movie)
    }

    async fn update_movie(&self, updated_movie: UpdatedMovie) -> Result<MovieData> {
        let mut state = self.state.lock();

        let movie = state
            .movies
            .iter_mut()
            .find(|m| m.id == updated_movie.id)
            .ok_or(DatabaseError::NotFound {
                resource: "movie",
                identifier: "id",
            })?;

        movie.title = updated_movie.title;
        movie.description = updated_movie.description;
        movie.film_type = updated_movie.film_type;
        movie.duration_minutes = updated_movie.duration_minutes;

        if let Some(poster_path) = updated_movie.poster_path {
            movie.poster_path = Some(poster_path);
        }

        Ok(movie.clone())
    }

    async fn delete_movie(&self, movie_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();

        state.movie(movie_id)?;

        if state.bookings.iter().any(|b| b.movie_id == movie_id) {
            return Err(DatabaseError::Conflict {
                resource: "movie",
                field: "bookings",
                value: movie_id.to_string(),
            });
        }

        state.movies.retain(|m| m.id != movie_id);
        Ok(())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let state = self.state.lock();

        let booking = state
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        state.expand(booking)
    }

    async fn booking_by_seat(
        &self,
        movie_id: PrimaryKey,
        party_date: &str,
        seat_number: &str,
    ) -> Result<BookingData> {
        let state = self.state.lock();

        let booking = state
            .bookings
            .iter()
            .find(|b| {
                b.movie_id == movie_id
                    && b.party_date == party_date
                    && b.seat_number == seat_number
            })
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "seat_number",
            })?;

        state.expand(booking)
    }

    async fn list_bookings(&self) -> Result<Vec<BookingData>> {
        let state = self.state.lock();
        state.bookings.iter().map(|b| state.expand(b)).collect()
    }

    async fn list_bookings_by_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let state = self.state.lock();

        state
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| state.expand(b))
            .collect()
    }

    async fn booked_seats(&self, movie_id: PrimaryKey, party_date: &str) -> Result<Vec<String>> {
        let seats = self
            .state
            .lock()
            .bookings
            .iter()
            .filter(|b| b.movie_id == movie_id && b.party_date == party_date)
            .map(|b| b.seat_number.clone())
            .collect();

        Ok(seats)
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let mut state = self.state.lock();

        state.movie(new_booking.movie_id)?;

        // The check and the insert happen under the same lock, so this is
        // as atomic as the unique index in postgres
        let taken = state.bookings.iter().any(|b| {
            b.movie_id == new_booking.movie_id
                && b.party_date == new_booking.party_date
                && b.seat_number == new_booking.seat_number
        });

        if taken {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "seat_number",
                value: new_booking.seat_number,
            });
        }

        let booking = StoredBooking {
            id: state.assign_id(),
            user_id: new_booking.user_id,
            movie_id: new_booking.movie_id,
            seat_number: new_booking.seat_number,
            party_date: new_booking.party_date,
            party_number: new_booking.party_number,
            price: new_booking.price,
            extras: new_booking.extras,
            created_at: Utc::now(),
        };

        let data = state.expand(&booking)?;
        state.bookings.push(booking);
        Ok(data)
    }

    async fn update_booking(&self, updated_booking: UpdatedBooking) -> Result<BookingData> {
        let mut state = self.state.lock();

        let index = state
            .bookings
            .iter()
            .position(|b| b.id == updated_booking.id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        // The unique index in postgres also rejects an update that lands
        // on an occupied seat
        let taken = state.bookings.iter().any(|b| {
            b.id != updated_booking.id
                && b.movie_id == updated_booking.movie_id
                && b.party_date == updated_booking.party_date
                && b.seat_number == updated_booking.seat_number
        });

        if taken {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "seat_number",
                value: updated_booking.seat_number,
            });
        }

        let booking = &mut state.bookings[index];

        booking.user_id = updated_booking.user_id;
        booking.movie_id = updated_booking.movie_id;
        booking.seat_number = updated_booking.seat_number;
        booking.party_date = updated_booking.party_date;
        booking.party_number = updated_booking.party_number;
        booking.price = updated_booking.price;

        if let Some(extras) = updated_booking.extras {
            booking.extras = extras;
        }

        let booking = booking.clone();
        state.expand(&booking)
    }

    async fn delete_booking(&self, booking_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();

        state
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        state.bookings.retain(|b| b.id != booking_id);
        Ok(())
    }
}
