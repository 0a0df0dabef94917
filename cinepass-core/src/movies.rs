use std::sync::Arc;

use log::info;

use crate::{Database, DatabaseError, MovieData, NewMovie, PrimaryKey, UpdatedMovie};

/// The movie catalog. Admin gating for writes happens at the HTTP layer.
pub struct MovieManager<Db> {
    db: Arc<Db>,
}

impl<Db> MovieManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Lists all movies, newest first
    pub async fn list_movies(&self) -> Result<Vec<MovieData>, DatabaseError> {
        self.db.list_movies().await
    }

    pub async fn movie_by_id(&self, movie_id: PrimaryKey) -> Result<MovieData, DatabaseError> {
        self.db.movie_by_id(movie_id).await
    }

    pub async fn create_movie(&self, new_movie: NewMovie) -> Result<MovieData, DatabaseError> {
        let movie = self.db.create_movie(new_movie).await?;

        info!("Movie {} added to the catalog", movie.title);
        Ok(movie)
    }

    /// Updates a movie. The poster is kept as-is when the update omits it.
    pub async fn update_movie(
        &self,
        updated_movie: UpdatedMovie,
    ) -> Result<MovieData, DatabaseError> {
        self.db.update_movie(updated_movie).await
    }

    /// Deletes a movie. Fails with a conflict while bookings reference it.
    pub async fn delete_movie(&self, movie_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.db.delete_movie(movie_id).await?;

        info!("Movie {} removed from the catalog", movie_id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{MemoryDatabase, NewBooking, NewUser};

    fn manager() -> (Arc<MemoryDatabase>, MovieManager<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let manager = MovieManager::new(&db);
        (db, manager)
    }

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: "A movie".to_string(),
            poster_path: Some("posters/one.jpg".to_string()),
            film_type: "Drama".to_string(),
            duration_minutes: 120,
        }
    }

    #[tokio::test]
    async fn test_catalog_crud() {
        let (_, manager) = manager();

        let first = manager
            .create_movie(new_movie("First"))
            .await
            .expect("movie is created");
        let second = manager
            .create_movie(new_movie("Second"))
            .await
            .expect("movie is created");

        let titles: Vec<_> = manager
            .list_movies()
            .await
            .expect("movies are listed")
            .into_iter()
            .map(|m| m.title)
            .collect();

        assert_eq!(titles, vec!["Second", "First"], "newest first");

        manager
            .delete_movie(first.id)
            .await
            .expect("movie is deleted");

        let result = manager.movie_by_id(first.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));

        manager
            .movie_by_id(second.id)
            .await
            .expect("other movie is untouched");
    }

    #[tokio::test]
    async fn test_update_keeps_poster_when_omitted() {
        let (_, manager) = manager();

        let movie = manager
            .create_movie(new_movie("First"))
            .await
            .expect("movie is created");

        let updated = manager
            .update_movie(UpdatedMovie {
                id: movie.id,
                title: "Renamed".to_string(),
                description: movie.description.clone(),
                poster_path: None,
                film_type: movie.film_type.clone(),
                duration_minutes: 90,
            })
            .await
            .expect("movie is updated");

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.duration_minutes, 90);
        assert_eq!(updated.poster_path.as_deref(), Some("posters/one.jpg"));
    }

    #[tokio::test]
    async fn test_movie_with_bookings_cannot_be_deleted() {
        let (db, manager) = manager();

        let movie = manager
            .create_movie(new_movie("First"))
            .await
            .expect("movie is created");

        let user = db
            .create_user(NewUser {
                username: "sam".to_string(),
                password: "hash".to_string(),
                display_name: "sam".to_string(),
                is_admin: false,
            })
            .await
            .expect("user is created");

        db.create_booking(NewBooking {
            user_id: user.id,
            movie_id: movie.id,
            seat_number: "A1".to_string(),
            party_date: "2024-06-01".to_string(),
            party_number: 1,
            price: 12.0,
            extras: serde_json::json!([]),
        })
        .await
        .expect("booking is created");

        let result = manager.delete_movie(movie.id).await;
        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
    }
}
