mod auth;
mod bookings;
mod db;
mod movies;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use bookings::*;
pub use db::*;
pub use movies::*;

/// The cinepass system, facilitating the movie catalog, seat reservations,
/// and authentication.
pub struct Cinepass<Db> {
    pub auth: Auth<Db>,
    pub bookings: BookingManager<Db>,
    pub movies: MovieManager<Db>,
}

impl<Db> Cinepass<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let database = Arc::new(database);

        Self {
            auth: Auth::new(&database),
            bookings: BookingManager::new(&database),
            movies: MovieManager::new(&database),
        }
    }
}
