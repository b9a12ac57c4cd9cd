use axum::extract::{Path, State};
use axum::Json;
use captain_core::card::{CardResponse, OkResponse, SaveCardRequest};
use captain_core::catalog::ActionCatalog;
use captain_core::codec;

use super::{check_card_id, with_db};
use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/card/{card_id}: a card never saved comes back empty.
pub async fn get_card(
    State(app): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<CardResponse>, AppError> {
    check_card_id(&app, &card_id)?;
    let id = card_id.clone();
    let stored = with_db(&app, move |db| db.get_card(&id)).await?;
    let body = match stored {
        Some(card) => card.to_response(),
        None => CardResponse {
            card_id,
            ..CardResponse::default()
        },
    };
    Ok(Json(body))
}

/// PUT|POST /v1/card/{card_id}: store notes and program. The program field
/// must decode against the standard catalog.
pub async fn put_card(
    State(app): State<AppState>,
    Path(card_id): Path<String>,
    Json(body): Json<SaveCardRequest>,
) -> Result<Json<OkResponse>, AppError> {
    check_card_id(&app, &card_id)?;
    let program = codec::decode_field(&ActionCatalog::standard(), body.program.as_deref())?;
    let id = card_id.clone();
    with_db(&app, move |db| {
        db.put_card(&id, &body.notes, body.program.as_deref())
    })
    .await?;
    tracing::info!(card = %card_id, actions = program.len(), "card saved");
    Ok(Json(OkResponse::done()))
}
