//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use serde::Serialize;
use utoipa::ToSchema;

use cinepass_core::{BookingData, MovieData, SessionData, UserData};

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: i32,
    username: String,
    display_name: String,
    is_admin: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Movie {
    id: i32,
    title: String,
    description: String,
    poster_path: Option<String>,
    film_type: String,
    duration_minutes: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Booking {
    id: i32,
    seat_number: String,
    party_date: String,
    party_number: i32,
    price: f64,
    #[schema(value_type = Object)]
    extras: serde_json::Value,
    created_at: String,
    user: User,
    movie: Movie,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            is_admin: self.is_admin,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Movie> for MovieData {
    fn to_serialized(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            poster_path: self.poster_path.clone(),
            film_type: self.film_type.clone(),
            duration_minutes: self.duration_minutes,
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id,
            seat_number: self.seat_number.clone(),
            party_date: self.party_date.clone(),
            party_number: self.party_number,
            price: self.price,
            extras: self.extras.clone(),
            created_at: self.created_at.to_rfc3339(),
            user: self.user.to_serialized(),
            movie: self.movie.to_serialized(),
        }
    }
}
