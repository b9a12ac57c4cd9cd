use captain_core::db::CardDb;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CardDb>,
    /// Client used to forward commands to robots.
    pub http: reqwest::Client,
    /// Secret card ids are signed with; `None` accepts any id.
    pub card_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db: CardDb,
        robot_timeout: Duration,
        card_secret: Option<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(robot_timeout).build()?;
        Ok(Self {
            db: Arc::new(db),
            http,
            card_secret: card_secret.map(Arc::from),
        })
    }
}
