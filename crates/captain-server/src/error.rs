use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use captain_core::error::CaptainError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 400 errors
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain for
/// request problems that have no `CaptainError` variant.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. The body is `{"error": msg}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }
}

fn status_of(e: &CaptainError) -> StatusCode {
    match e {
        CaptainError::CardNotFound(_) | CaptainError::RobotNotFound(_) => StatusCode::NOT_FOUND,
        CaptainError::RobotAlreadyAssociated(_) => StatusCode::CONFLICT,
        CaptainError::UnknownKind(_)
        | CaptainError::InvalidParam { .. }
        | CaptainError::MalformedProgram(_)
        | CaptainError::TransportDecode(_)
        | CaptainError::IndexOutOfRange { .. }
        | CaptainError::InvalidCardId(_)
        | CaptainError::InvalidRobotName(_)
        | CaptainError::UnknownCommand(_) => StatusCode::BAD_REQUEST,
        CaptainError::Http(_) | CaptainError::Api { .. } => StatusCode::BAD_GATEWAY,
        CaptainError::InvalidCatalog(_)
        | CaptainError::Store(_)
        | CaptainError::HomeNotFound
        | CaptainError::Io(_)
        | CaptainError::Yaml(_)
        | CaptainError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequestError>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<CaptainError>() {
            status_of(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
