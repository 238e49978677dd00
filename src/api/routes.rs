/*
 * Responsibility
 * - URL 構造を定義 (/, /health, /movies, /actors)
 * - 必要な権限は各 handler の Authorized<P> 引数で決まる
 */
use axum::{
    Router,
    routing::{get, patch},
};

use crate::state::AppState;

use crate::api::handlers::{
    actors::{create_actor, delete_actor, list_actors, update_actor},
    health::{health, index},
    movies::{create_movie, delete_movie, list_movies, update_movie},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{movie_id}", patch(update_movie).delete(delete_movie))
        .route("/actors", get(list_actors).post(create_actor))
        .route("/actors/{actor_id}", patch(update_actor).delete(delete_actor))
}
