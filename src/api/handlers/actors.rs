/*
 * Responsibility
 * - /actors 系 CRUD handler
 * - 第一引数の Authorized<P> で認可を済ませてから Path/Json を取り出す
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
        dto::actors::{ActorResponse, CreateActorRequest, UpdateActorRequest},
        extractors::authorized::{CanDeleteActors, CanGetActors, CanPatchActors, CanPostActors},
    },
    error::AppError,
    repos::actor_repo,
    state::AppState,
};

pub async fn list_actors(
    _auth: CanGetActors,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let actors: Vec<ActorResponse> = actor_repo::list(&state.db)
        .await?
        .into_iter()
        .map(ActorResponse::from)
        .collect();

    Ok(Json(json!({"success": true, "actors": actors})))
}

pub async fn create_actor(
    auth: CanPostActors,
    State(state): State<AppState>,
    req: Result<Json<CreateActorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = req?;
    let new = req.validate().map_err(AppError::bad_request)?;

    let row = actor_repo::create(&state.db, &new.name, new.age, &new.gender).await?;
    tracing::info!(subject = auth.subject(), actor_id = row.id, "actor created");

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "actor": ActorResponse::from(row)})),
    ))
}

pub async fn update_actor(
    auth: CanPatchActors,
    State(state): State<AppState>,
    actor_id: Result<Path<i32>, PathRejection>,
    req: Result<Json<UpdateActorRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(actor_id) = actor_id?;
    let Json(req) = req?;
    let changes = req.validate().map_err(AppError::bad_request)?;

    let row = actor_repo::update(
        &state.db,
        actor_id,
        changes.name.as_deref(),
        changes.age,
        changes.gender.as_deref(),
    )
    .await?
    .ok_or(AppError::NotFound)?;
    tracing::info!(subject = auth.subject(), actor_id, "actor updated");

    Ok(Json(json!({"success": true, "actor": ActorResponse::from(row)})))
}

pub async fn delete_actor(
    auth: CanDeleteActors,
    State(state): State<AppState>,
    actor_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(actor_id) = actor_id?;

    if !actor_repo::delete(&state.db, actor_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(subject = auth.subject(), actor_id, "actor deleted");

    Ok(Json(json!({"success": true, "deleted": actor_id})))
}
