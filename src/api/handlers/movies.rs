/*
 * Responsibility
 * - /movies 系 CRUD handler
 * - 第一引数の Authorized<P> で認可を済ませてから Path/Json を取り出す
 * - 更新系は監査用に sub をログに残す
 */
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
    api::{
        dto::movies::{CreateMovieRequest, MovieResponse, UpdateMovieRequest},
        extractors::authorized::{CanDeleteMovies, CanGetMovies, CanPatchMovies, CanPostMovies},
    },
    error::AppError,
    repos::movie_repo,
    state::AppState,
};

pub async fn list_movies(
    _auth: CanGetMovies,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let movies: Vec<MovieResponse> = movie_repo::list(&state.db)
        .await?
        .into_iter()
        .map(MovieResponse::from)
        .collect();

    Ok(Json(json!({"success": true, "movies": movies})))
}

pub async fn create_movie(
    auth: CanPostMovies,
    State(state): State<AppState>,
    req: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = req?;
    let (title, release_date) = req.validate().map_err(AppError::bad_request)?;

    let row = movie_repo::create(&state.db, &title, release_date).await?;
    tracing::info!(subject = auth.subject(), movie_id = row.id, "movie created");

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "movie": MovieResponse::from(row)})),
    ))
}

pub async fn update_movie(
    auth: CanPatchMovies,
    State(state): State<AppState>,
    movie_id: Result<Path<i32>, PathRejection>,
    req: Result<Json<UpdateMovieRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(movie_id) = movie_id?;
    let Json(req) = req?;
    let (title, release_date) = req.validate().map_err(AppError::bad_request)?;

    let row = movie_repo::update(&state.db, movie_id, title.as_deref(), release_date)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(subject = auth.subject(), movie_id, "movie updated");

    Ok(Json(json!({"success": true, "movie": MovieResponse::from(row)})))
}

pub async fn delete_movie(
    auth: CanDeleteMovies,
    State(state): State<AppState>,
    movie_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(movie_id) = movie_id?;

    if !movie_repo::delete(&state.db, movie_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(subject = auth.subject(), movie_id, "movie deleted");

    Ok(Json(json!({"success": true, "deleted": movie_id})))
}
