use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptainError {
    #[error("unknown action kind: {0}")]
    UnknownKind(String),

    #[error("invalid parameter '{param}' for action {kind}")]
    InvalidParam { kind: String, param: String },

    #[error("invalid action catalog: {0}")]
    InvalidCatalog(String),

    #[error("malformed program: {0}")]
    MalformedProgram(String),

    #[error("cannot decode program field: {0}")]
    TransportDecode(String),

    #[error("index {index} out of range for program of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("robot not found: {0}")]
    RobotNotFound(String),

    #[error("a robot is already associated with card {0}")]
    RobotAlreadyAssociated(String),

    #[error("invalid card id: {0}")]
    InvalidCardId(String),

    #[error("invalid robot name '{0}': use letters, digits, '-' or '_'")]
    InvalidRobotName(String),

    #[error("unknown robot command '{0}': valid values are run, stop, upload, ping")]
    UnknownCommand(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CaptainError {
    fn from(err: reqwest::Error) -> Self {
        CaptainError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaptainError>;
