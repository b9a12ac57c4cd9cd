use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use captain_core::card::{OkResponse, PutRobotRequest, Robot, RobotCommand, RobotFilter};
use serde::Deserialize;

use super::control::forward;
use super::with_db;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RobotsQuery {
    #[serde(default)]
    pub filter: Option<String>,
}

/// GET /v1/robots?filter=used|free
pub async fn list_robots(
    State(app): State<AppState>,
    Query(query): Query<RobotsQuery>,
) -> Result<Json<Vec<Robot>>, AppError> {
    let filter: RobotFilter = query
        .filter
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(AppError::bad_request)?;
    let robots = with_db(&app, move |db| db.list_robots(filter)).await?;
    Ok(Json(robots))
}

/// GET /v1/robot/{name}
pub async fn get_robot(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Robot>, AppError> {
    let robot = with_db(&app, move |db| db.get_robot(&name)).await?;
    Ok(Json(robot))
}

/// PUT|POST /v1/robot/{name}: create the robot or change its URL.
pub async fn put_robot(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PutRobotRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let url = body.url.trim().to_string();
    if url.is_empty() {
        return Err(AppError::bad_request("url is required"));
    }
    let robot = with_db(&app, move |db| db.put_robot(&name, &url)).await?;
    tracing::info!(robot = %robot.name, url = %robot.url, "robot registered");
    Ok(Json(OkResponse::done()))
}

/// DELETE /v1/robot/{name}
pub async fn delete_robot(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    let n = name.clone();
    if with_db(&app, move |db| db.delete_robot(&n)).await? {
        tracing::info!(robot = %name, "robot removed");
    }
    Ok(Json(OkResponse::done()))
}

/// GET /v1/robot/{name}/ping
pub async fn ping_robot(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let robot = with_db(&app, move |db| db.get_robot(&name)).await?;
    forward(&app, &robot, RobotCommand::Ping, None).await
}

/// PUT|POST /v1/robot/{name}/card/{card_id}
pub async fn associate(
    State(app): State<AppState>,
    Path((name, card_id)): Path<(String, String)>,
) -> Result<Json<OkResponse>, AppError> {
    let robot = with_db(&app, move |db| db.associate(&name, &card_id)).await?;
    tracing::info!(robot = %robot.name, card = %robot.card_id, "robot associated");
    Ok(Json(OkResponse::done()))
}

/// DELETE /v1/robot/{name}/card
pub async fn dissociate(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    let robot = with_db(&app, move |db| db.dissociate(&name)).await?;
    tracing::info!(robot = %robot.name, "robot dissociated");
    Ok(Json(OkResponse::done()))
}
