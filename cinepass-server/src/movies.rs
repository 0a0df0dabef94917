use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json,
};
use cinepass_core::{NewMovie, UpdatedMovie};

use crate::{
    auth::{Admin, Session},
    errors::ServerResult,
    schemas::{NewMovieSchema, UpdatedMovieSchema, ValidatedJson},
    serialized::{Movie, ToSerialized},
    Router, ServerContext,
};

#[utoipa::path(
    get,
    path = "/movies",
    tag = "movies",
    responses(
        (status = 200, body = Vec<Movie>)
    )
)]
async fn list_movies(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Movie>>> {
    let movies = context.cinepass.movies.list_movies().await?;

    Ok(Json(movies.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/movies/{id}",
    tag = "movies",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Movie)
    )
)]
async fn movie(
    _session: Session,
    State(context): State<ServerContext>,
    Path(movie_id): Path<i32>,
) -> ServerResult<Json<Movie>> {
    let movie = context.cinepass.movies.movie_by_id(movie_id).await?;

    Ok(Json(movie.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/movies",
    tag = "movies",
    request_body = NewMovieSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Movie),
        (status = 403, description = "Admin access required")
    )
)]
async fn create_movie(
    _admin: Admin,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewMovieSchema>,
) -> ServerResult<(StatusCode, Json<Movie>)> {
    let movie = context
        .cinepass
        .movies
        .create_movie(NewMovie {
            title: body.title,
            description: body.description,
            poster_path: body.poster_path,
            film_type: body.film_type,
            duration_minutes: body.duration_minutes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(movie.to_serialized())))
}

#[utoipa::path(
    put,
    path = "/movies/{id}",
    tag = "movies",
    request_body = UpdatedMovieSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Movie),
        (status = 403, description = "Admin access required")
    )
)]
async fn update_movie(
    _admin: Admin,
    State(context): State<ServerContext>,
    Path(movie_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdatedMovieSchema>,
) -> ServerResult<Json<Movie>> {
    let movie = context
        .cinepass
        .movies
        .update_movie(UpdatedMovie {
            id: movie_id,
            title: body.title,
            description: body.description,
            poster_path: body.poster_path,
            film_type: body.film_type,
            duration_minutes: body.duration_minutes,
        })
        .await?;

    Ok(Json(movie.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/movies/{id}",
    tag = "movies",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The movie was deleted"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "The movie still has bookings")
    )
)]
async fn delete_movie(
    _admin: Admin,
    State(context): State<ServerContext>,
    Path(movie_id): Path<i32>,
) -> ServerResult<Json<serde_json::Value>> {
    context.cinepass.movies.delete_movie(movie_id).await?;

    Ok(Json(serde_json::json!({
        "message": "Movie deleted successfully"
    })))
}

pub fn router() -> Router {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/:id",
            get(movie).put(update_movie).delete(delete_movie),
        )
}
