use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::{BookingData, Database, DatabaseError, NewBooking, PrimaryKey, UpdatedBooking, UserData};

/// The seat reservation service. Guards the one invariant that matters:
/// a seat for a showing can be claimed by at most one booking.
pub struct BookingManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum BookingError {
    /// The seat is already reserved for the same movie and date
    #[error("Seat {seat_number} is already booked for this showing")]
    SeatTaken { seat_number: String },
    /// The caller is neither the owner of the booking nor an admin
    #[error("You can only manage your own bookings")]
    NotOwner,
    #[error(transparent)]
    Db(DatabaseError),
}

impl<Db> BookingManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Reserves a seat for the user. The lookup here is a fast path, the
    /// storage layer enforces uniqueness atomically and its conflict is
    /// mapped to [BookingError::SeatTaken] as well.
    pub async fn create_booking(
        &self,
        user: &UserData,
        new_booking: NewBooking,
    ) -> Result<BookingData, BookingError> {
        self.db
            .movie_by_id(new_booking.movie_id)
            .await
            .map_err(BookingError::Db)?;

        let seat_number = new_booking.seat_number.clone();

        let existing = self
            .db
            .booking_by_seat(
                new_booking.movie_id,
                &new_booking.party_date,
                &new_booking.seat_number,
            )
            .await;

        match existing {
            Ok(_) => return Err(BookingError::SeatTaken { seat_number }),
            Err(DatabaseError::NotFound { .. }) => {}
            Err(e) => return Err(BookingError::Db(e)),
        }

        // The booking is always owned by the authenticated user
        let booking = self
            .db
            .create_booking(NewBooking {
                user_id: user.id,
                ..new_booking
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => BookingError::SeatTaken { seat_number },
                e => BookingError::Db(e),
            })?;

        info!(
            "User {} booked seat {} for movie {} on {}",
            user.username, booking.seat_number, booking.movie.title, booking.party_date
        );

        Ok(booking)
    }

    /// Lists all bookings for admins, or the user's own bookings otherwise
    pub async fn list_bookings(&self, user: &UserData) -> Result<Vec<BookingData>, DatabaseError> {
        if user.is_admin {
            self.db.list_bookings().await
        } else {
            self.db.list_bookings_by_user(user.id).await
        }
    }

    /// Returns a booking if the user is allowed to see it
    pub async fn booking_by_id(
        &self,
        user: &UserData,
        booking_id: PrimaryKey,
    ) -> Result<BookingData, BookingError> {
        let booking = self
            .db
            .booking_by_id(booking_id)
            .await
            .map_err(BookingError::Db)?;

        if !can_access(user, &booking) {
            return Err(BookingError::NotOwner);
        }

        Ok(booking)
    }

    /// Updates a booking with the same ownership rules as reading it.
    /// A non-admin cannot reassign the booking to another user.
    ///
    /// Note: seat uniqueness is deliberately not re-checked here. The unique
    /// index still rejects an update onto an occupied seat.
    pub async fn update_booking(
        &self,
        user: &UserData,
        updated_booking: UpdatedBooking,
    ) -> Result<BookingData, BookingError> {
        // Resolve the booking first so a missing id is reported before
        // any ownership question arises
        self.booking_by_id(user, updated_booking.id).await?;

        if !user.is_admin && updated_booking.user_id != user.id {
            return Err(BookingError::NotOwner);
        }

        let seat_number = updated_booking.seat_number.clone();

        self.db
            .update_booking(updated_booking)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => BookingError::SeatTaken { seat_number },
                e => BookingError::Db(e),
            })
    }

    /// Deletes a booking with the same ownership rules as reading it
    pub async fn delete_booking(
        &self,
        user: &UserData,
        booking_id: PrimaryKey,
    ) -> Result<(), BookingError> {
        let booking = self.booking_by_id(user, booking_id).await?;

        self.db
            .delete_booking(booking_id)
            .await
            .map_err(BookingError::Db)?;

        info!(
            "User {} deleted booking {} (seat {})",
            user.username, booking.id, booking.seat_number
        );

        Ok(())
    }

    /// Returns the seat numbers already reserved for a showing. Advisory
    /// only, the authoritative check happens on creation.
    pub async fn booked_seats(
        &self,
        movie_id: PrimaryKey,
        party_date: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        self.db.booked_seats(movie_id, party_date).await
    }
}

/// The single ownership predicate shared by the read, update, and delete paths
pub fn can_access(user: &UserData, booking: &BookingData) -> bool {
    user.is_admin || booking.user.id == user.id
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::{MemoryDatabase, NewMovie, NewUser};

    struct Fixture {
        db: Arc<MemoryDatabase>,
        manager: BookingManager<MemoryDatabase>,
        movie_id: PrimaryKey,
        user: UserData,
        other: UserData,
        admin: UserData,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let manager = BookingManager::new(&db);

        let movie = db
            .create_movie(NewMovie {
                title: "The Seventh Seal".to_string(),
                description: "A knight plays chess with Death".to_string(),
                poster_path: None,
                film_type: "Drama".to_string(),
                duration_minutes: 96,
            })
            .await
            .expect("movie is created");

        let user = create_user(&db, "sam", false).await;
        let other = create_user(&db, "alex", false).await;
        let admin = create_user(&db, "admin", true).await;

        Fixture {
            db,
            manager,
            movie_id: movie.id,
            user,
            other,
            admin,
        }
    }

    async fn create_user(db: &MemoryDatabase, username: &str, is_admin: bool) -> UserData {
        db.create_user(NewUser {
            username: username.to_string(),
            password: "hash".to_string(),
            display_name: username.to_string(),
            is_admin,
        })
        .await
        .expect("user is created")
    }

    fn new_booking(user: &UserData, movie_id: PrimaryKey, seat: &str) -> NewBooking {
        NewBooking {
            user_id: user.id,
            movie_id,
            seat_number: seat.to_string(),
            party_date: "2024-06-01".to_string(),
            party_number: 2,
            price: 24.5,
            extras: serde_json::json!([]),
        }
    }

    fn updated_from(booking: &BookingData, user_id: PrimaryKey) -> UpdatedBooking {
        UpdatedBooking {
            id: booking.id,
            user_id,
            movie_id: booking.movie.id,
            seat_number: booking.seat_number.clone(),
            party_date: booking.party_date.clone(),
            party_number: booking.party_number,
            price: booking.price,
            extras: None,
        }
    }

    #[tokio::test]
    async fn test_same_seat_cannot_be_booked_twice() {
        let f = fixture().await;

        f.manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A1"))
            .await
            .expect("first booking succeeds");

        let result = f
            .manager
            .create_booking(&f.other, new_booking(&f.other, f.movie_id, "A1"))
            .await;

        assert!(matches!(result, Err(BookingError::SeatTaken { .. })));

        // Same seat on another date is fine
        let mut on_other_date = new_booking(&f.other, f.movie_id, "A1");
        on_other_date.party_date = "2024-06-02".to_string();

        f.manager
            .create_booking(&f.other, on_other_date)
            .await
            .expect("same seat on another date succeeds");
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_one_winner() {
        let f = fixture().await;

        let (first, second) = tokio::join!(
            f.manager
                .create_booking(&f.user, new_booking(&f.user, f.movie_id, "B4")),
            f.manager
                .create_booking(&f.other, new_booking(&f.other, f.movie_id, "B4")),
        );

        let successes = [first.is_ok(), second.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();

        assert_eq!(successes, 1, "exactly one of the two creates may succeed");

        let seats = f
            .manager
            .booked_seats(f.movie_id, "2024-06-01")
            .await
            .expect("seats are listed");

        assert_eq!(seats, vec!["B4".to_string()]);
    }

    #[tokio::test]
    async fn test_booking_is_owned_by_the_caller() {
        let f = fixture().await;

        // The user_id in the request is ignored in favor of the session user
        let mut body = new_booking(&f.user, f.movie_id, "C1");
        body.user_id = f.other.id;

        let booking = f
            .manager
            .create_booking(&f.user, body)
            .await
            .expect("booking succeeds");

        assert_eq!(booking.user.id, f.user.id);
    }

    #[tokio::test]
    async fn test_booking_for_missing_movie_fails() {
        let f = fixture().await;

        let result = f
            .manager
            .create_booking(&f.user, new_booking(&f.user, 999, "A1"))
            .await;

        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_only_shows_own_bookings() {
        let f = fixture().await;

        f.manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A1"))
            .await
            .expect("booking succeeds");
        f.manager
            .create_booking(&f.other, new_booking(&f.other, f.movie_id, "A2"))
            .await
            .expect("booking succeeds");

        let own = f.manager.list_bookings(&f.user).await.expect("list succeeds");
        assert_eq!(own.len(), 1);
        assert!(own.iter().all(|b| b.user.id == f.user.id));

        let all = f
            .manager
            .list_bookings(&f.admin)
            .await
            .expect("list succeeds");
        assert_eq!(all.len(), 2, "admins see everything");
    }

    #[tokio::test]
    async fn test_foreign_booking_is_not_accessible() {
        let f = fixture().await;

        let booking = f
            .manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A1"))
            .await
            .expect("booking succeeds");

        let result = f.manager.booking_by_id(&f.other, booking.id).await;
        assert!(matches!(result, Err(BookingError::NotOwner)));

        let result = f
            .manager
            .update_booking(&f.other, updated_from(&booking, f.other.id))
            .await;
        assert!(matches!(result, Err(BookingError::NotOwner)));

        let result = f.manager.delete_booking(&f.other, booking.id).await;
        assert!(matches!(result, Err(BookingError::NotOwner)));

        // Admins pass the same checks
        f.manager
            .booking_by_id(&f.admin, booking.id)
            .await
            .expect("admin can read any booking");
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found_before_ownership() {
        let f = fixture().await;

        let result = f.manager.booking_by_id(&f.user, 999).await;
        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));

        let result = f.manager.delete_booking(&f.user, 999).await;
        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_booked_seats_is_a_set_of_reserved_seats() {
        let f = fixture().await;

        f.manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A2"))
            .await
            .expect("booking succeeds");
        f.manager
            .create_booking(&f.other, new_booking(&f.other, f.movie_id, "A1"))
            .await
            .expect("booking succeeds");

        let seats: HashSet<_> = f
            .manager
            .booked_seats(f.movie_id, "2024-06-01")
            .await
            .expect("seats are listed")
            .into_iter()
            .collect();

        let expected: HashSet<_> = ["A1".to_string(), "A2".to_string()].into_iter().collect();
        assert_eq!(seats, expected);

        let empty = f
            .manager
            .booked_seats(f.movie_id, "2024-07-01")
            .await
            .expect("seats are listed");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_reassign_a_booking() {
        let f = fixture().await;

        let booking = f
            .manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A1"))
            .await
            .expect("booking succeeds");

        let result = f
            .manager
            .update_booking(&f.user, updated_from(&booking, f.other.id))
            .await;
        assert!(matches!(result, Err(BookingError::NotOwner)));

        // The booking is unchanged
        let unchanged = f
            .manager
            .booking_by_id(&f.user, booking.id)
            .await
            .expect("booking still exists");
        assert_eq!(unchanged.user.id, f.user.id);

        // Admins may reassign
        let reassigned = f
            .manager
            .update_booking(&f.admin, updated_from(&booking, f.other.id))
            .await
            .expect("admin reassigns");
        assert_eq!(reassigned.user.id, f.other.id);
    }

    #[tokio::test]
    async fn test_update_onto_an_occupied_seat_conflicts() {
        let f = fixture().await;

        f.manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A1"))
            .await
            .expect("booking succeeds");

        let second = f
            .manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A2"))
            .await
            .expect("booking succeeds");

        let mut update = updated_from(&second, f.user.id);
        update.seat_number = "A1".to_string();

        let result = f.manager.update_booking(&f.user, update).await;
        assert!(
            matches!(result, Err(BookingError::SeatTaken { .. })),
            "the storage layer rejects an update onto an occupied seat"
        );

        // The seat assignment is unchanged, no duplicate was created
        let seats = f
            .manager
            .booked_seats(f.movie_id, "2024-06-01")
            .await
            .expect("seats are listed");
        assert_eq!(seats, vec!["A1".to_string(), "A2".to_string()]);
    }

    #[tokio::test]
    async fn test_update_keeps_extras_when_omitted() {
        let f = fixture().await;

        let mut body = new_booking(&f.user, f.movie_id, "A1");
        body.extras = serde_json::json!(["popcorn", "soda"]);

        let booking = f
            .manager
            .create_booking(&f.user, body)
            .await
            .expect("booking succeeds");

        let mut update = updated_from(&booking, f.user.id);
        update.party_number = 4;

        let updated = f
            .manager
            .update_booking(&f.user, update)
            .await
            .expect("update succeeds");

        assert_eq!(updated.party_number, 4);
        assert_eq!(updated.extras, serde_json::json!(["popcorn", "soda"]));
    }

    #[tokio::test]
    async fn test_double_delete_is_not_found() {
        let f = fixture().await;

        let booking = f
            .manager
            .create_booking(&f.user, new_booking(&f.user, f.movie_id, "A1"))
            .await
            .expect("booking succeeds");

        f.manager
            .delete_booking(&f.user, booking.id)
            .await
            .expect("first delete succeeds");

        let result = f.manager.delete_booking(&f.user, booking.id).await;
        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));

        // And the seat frees up
        let seats = f
            .db
            .booked_seats(f.movie_id, "2024-06-01")
            .await
            .expect("seats are listed");
        assert!(seats.is_empty());
    }
}
