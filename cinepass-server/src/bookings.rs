use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json,
};
use cinepass_core::{NewBooking, UpdatedBooking};

use crate::{
    auth::Session,
    errors::{ServerError, ServerResult},
    schemas::{NewBookingSchema, UpdatedBookingSchema, ValidatedJson},
    serialized::{Booking, ToSerialized},
    Router, ServerContext,
};

#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
async fn list_bookings(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context
        .cinepass
        .bookings
        .list_bookings(&session.user())
        .await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking)
    )
)]
async fn booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .cinepass
        .bookings
        .booking_by_id(&session.user(), booking_id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = NewBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Booking),
        (status = 409, description = "The seat is already booked for this showing")
    )
)]
async fn create_booking(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBookingSchema>,
) -> ServerResult<(StatusCode, Json<Booking>)> {
    let user = session.user();

    // A booking can only be created for oneself
    if body.user_id != user.id {
        return Err(ServerError::NotOwner);
    }

    let booking = context
        .cinepass
        .bookings
        .create_booking(
            &user,
            NewBooking {
                user_id: user.id,
                movie_id: body.movie_id,
                seat_number: body.seat_number,
                party_date: body.party_date,
                party_number: body.party_number,
                price: body.price,
                extras: body.extras.unwrap_or_else(|| serde_json::json!([])),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking.to_serialized())))
}

#[utoipa::path(
    put,
    path = "/bookings/{id}",
    tag = "bookings",
    request_body = UpdatedBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking)
    )
)]
async fn update_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdatedBookingSchema>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .cinepass
        .bookings
        .update_booking(
            &session.user(),
            UpdatedBooking {
                id: booking_id,
                user_id: body.user_id,
                movie_id: body.movie_id,
                seat_number: body.seat_number,
                party_date: body.party_date,
                party_number: body.party_number,
                price: body.price,
                extras: body.extras,
            },
        )
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The booking was deleted")
    )
)]
async fn delete_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
) -> ServerResult<Json<serde_json::Value>> {
    context
        .cinepass
        .bookings
        .delete_booking(&session.user(), booking_id)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Booking deleted successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/booked_seats/{party_date}/{movie_id}",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<String>, description = "Seat numbers already reserved for the showing. Advisory only, creation is the authoritative check")
    )
)]
async fn booked_seats(
    _session: Session,
    State(context): State<ServerContext>,
    Path((party_date, movie_id)): Path<(String, i32)>,
) -> ServerResult<Json<Vec<String>>> {
    let seats = context
        .cinepass
        .bookings
        .booked_seats(movie_id, &party_date)
        .await?;

    Ok(Json(seats))
}

pub fn router() -> Router {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/:id",
            get(booking).put(update_booking).delete(delete_booking),
        )
        .route("/booked_seats/:party_date/:movie_id", get(booked_seats))
}
