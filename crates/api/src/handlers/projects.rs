use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use db::repository::projects as project_repo;
use uuid::Uuid;

use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct CreateProjectDto {
    pub name: String,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<db::models::ProjectRow>>, StatusCode> {
    project_repo::list_projects(&state.pool).await.map(Json).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectDto>,
) -> Result<(StatusCode, Json<db::models::ProjectRow>), StatusCode> {
    project_repo::create_project(&state.pool, &payload.name)
        .await
        .map(|project| (StatusCode::CREATED, Json(project)))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn get(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<db::models::ProjectRow>, StatusCode> {
    match project_repo::get_project(&state.pool, id).await {
        Ok(project) => Ok(Json(project)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn delete(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    match project_repo::delete_project(&state.pool, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
