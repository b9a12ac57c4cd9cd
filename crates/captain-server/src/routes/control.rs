use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use captain_core::card::{CardResponse, Robot, RobotCommand};
use captain_core::error::CaptainError;

use super::{check_card_id, with_db};
use crate::error::AppError;
use crate::state::AppState;

/// `{robot.url}/{command}`
fn robot_endpoint(robot: &Robot, command: RobotCommand) -> String {
    format!("{}/{}", robot.url.trim_end_matches('/'), command)
}

/// Send `command` to `robot` and relay its status, content type and body.
/// Upload PUTs `card` as JSON; every other command is a plain GET.
pub(crate) async fn forward(
    app: &AppState,
    robot: &Robot,
    command: RobotCommand,
    card: Option<&CardResponse>,
) -> Result<Response, AppError> {
    let url = robot_endpoint(robot, command);
    tracing::info!(robot = %robot.name, %url, %command, "forwarding to robot");

    let request = match card {
        Some(card) => app.http.put(&url).json(card),
        None => app.http.get(&url),
    };
    let res = request
        .send()
        .await
        .map_err(|e| CaptainError::Http(format!("robot {} unreachable: {e}", robot.name)))?;

    let status = StatusCode::from_u16(res.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = res
        .bytes()
        .await
        .map_err(|e| CaptainError::Http(e.to_string()))?
        .to_vec();
    tracing::debug!(robot = %robot.name, status = status.as_u16(), "robot answered");

    let mut response = (status, body).into_response();
    if let Some(ct) = content_type.and_then(|ct| ct.parse().ok()) {
        response.headers_mut().insert(header::CONTENT_TYPE, ct);
    }
    Ok(response)
}

async fn robot_of(app: &AppState, card_id: &str) -> Result<Robot, AppError> {
    check_card_id(app, card_id)?;
    let id = card_id.to_string();
    let robot = with_db(app, move |db| db.robot_for_card(&id)).await?;
    robot.ok_or_else(|| {
        AppError(
            CaptainError::RobotNotFound(format!("no robot associated with card {card_id}")).into(),
        )
    })
}

async fn relay(app: AppState, card_id: String, command: RobotCommand) -> Result<Response, AppError> {
    let robot = robot_of(&app, &card_id).await?;
    tracing::info!(card = %card_id, %command, "card command");
    forward(&app, &robot, command, None).await
}

/// GET /v1/card/{card_id}/run
pub async fn run(
    State(app): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Response, AppError> {
    relay(app, card_id, RobotCommand::Run).await
}

/// GET /v1/card/{card_id}/stop
pub async fn stop(
    State(app): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Response, AppError> {
    relay(app, card_id, RobotCommand::Stop).await
}

/// GET /v1/card/{card_id}/ping
pub async fn ping(
    State(app): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Response, AppError> {
    relay(app, card_id, RobotCommand::Ping).await
}

/// GET|PUT|POST /v1/card/{card_id}/upload: push the stored card to the
/// associated robot.
pub async fn upload(
    State(app): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Response, AppError> {
    let robot = robot_of(&app, &card_id).await?;
    let id = card_id.clone();
    let card = with_db(&app, move |db| db.get_card(&id))
        .await?
        .ok_or_else(|| AppError(CaptainError::CardNotFound(card_id.clone()).into()))?;
    tracing::info!(card = %card_id, "card upload");
    forward(&app, &robot, RobotCommand::Upload, Some(&card.to_response())).await
}
