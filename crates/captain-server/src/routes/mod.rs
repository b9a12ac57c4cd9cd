pub mod cards;
pub mod control;
pub mod robots;

use crate::error::AppError;
use crate::state::AppState;
use captain_core::db::CardDb;

/// Run a store operation on the blocking pool.
pub(crate) async fn with_db<T, F>(app: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&CardDb) -> captain_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(result)
}

/// Reject card ids not signed with the configured secret.
pub(crate) fn check_card_id(app: &AppState, card_id: &str) -> Result<(), AppError> {
    if let Some(secret) = app.card_secret.as_deref() {
        captain_core::card_id::verify(secret.as_bytes(), card_id)?;
    }
    Ok(())
}
