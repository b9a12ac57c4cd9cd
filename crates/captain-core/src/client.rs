//! Client side of the card-store API.

use crate::card::{
    CardResponse, CommandReport, OkResponse, PutRobotRequest, Robot, RobotCommand, RobotFilter,
    SaveCardRequest,
};
use crate::error::{CaptainError, Result};
use serde::de::DeserializeOwned;
use reqwest::Url;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

/// The calls an editing session makes against the card store.
pub trait CardApi {
    fn load_card(&self, card_id: &str) -> Result<CardResponse>;
    fn save_card(&self, card_id: &str, body: &SaveCardRequest) -> Result<()>;
    fn command(&self, card_id: &str, command: RobotCommand) -> Result<CommandReport>;
}

impl<T: CardApi + ?Sized> CardApi for &T {
    fn load_card(&self, card_id: &str) -> Result<CardResponse> {
        (**self).load_card(card_id)
    }

    fn save_card(&self, card_id: &str, body: &SaveCardRequest) -> Result<()> {
        (**self).save_card(card_id, body)
    }

    fn command(&self, card_id: &str, command: RobotCommand) -> Result<CommandReport> {
        (**self).command(card_id, command)
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Blocking HTTP client for the card-store API, e.g.
/// `ApiClient::new("http://localhost:8081/v1", Duration::from_secs(10))`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append `segments` to the base URL, percent-encoding each one so card
    /// ids and robot names can't escape their path segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CaptainError::Http(format!("invalid api url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| CaptainError::Http(format!("invalid api url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "GET");
        let resp = check(self.http.get(url).send()?)?;
        Ok(resp.json()?)
    }

    fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, url: Url, body: &B) -> Result<T> {
        tracing::debug!(%url, "PUT");
        let resp = check(self.http.put(url).json(body).send()?)?;
        Ok(resp.json()?)
    }

    fn delete(&self, url: Url) -> Result<()> {
        tracing::debug!(%url, "DELETE");
        check(self.http.delete(url).send()?)?;
        Ok(())
    }

    fn relay(&self, url: Url, command: RobotCommand) -> Result<CommandReport> {
        tracing::debug!(%url, %command, "robot command");
        let resp = check(self.http.get(url).send()?)?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(CommandReport {
            command,
            status,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Robot administration
    // -----------------------------------------------------------------------

    pub fn list_robots(&self, filter: RobotFilter) -> Result<Vec<Robot>> {
        let mut url = self.url(&["robots"])?;
        if filter != RobotFilter::All {
            url.query_pairs_mut().append_pair("filter", filter.as_str());
        }
        self.get_json(url)
    }

    pub fn get_robot(&self, name: &str) -> Result<Robot> {
        self.get_json(self.url(&["robot", name])?)
    }

    pub fn put_robot(&self, name: &str, url: &str) -> Result<()> {
        let body = PutRobotRequest {
            url: url.to_string(),
        };
        let _: OkResponse = self.put_json(self.url(&["robot", name])?, &body)?;
        Ok(())
    }

    pub fn delete_robot(&self, name: &str) -> Result<()> {
        self.delete(self.url(&["robot", name])?)
    }

    pub fn associate(&self, name: &str, card_id: &str) -> Result<()> {
        let _: OkResponse = self.put_json(self.url(&["robot", name, "card", card_id])?, &())?;
        Ok(())
    }

    pub fn dissociate(&self, name: &str) -> Result<()> {
        self.delete(self.url(&["robot", name, "card"])?)
    }

    pub fn ping_robot(&self, name: &str) -> Result<CommandReport> {
        self.relay(self.url(&["robot", name, "ping"])?, RobotCommand::Ping)
    }
}

impl CardApi for ApiClient {
    fn load_card(&self, card_id: &str) -> Result<CardResponse> {
        self.get_json(self.url(&["card", card_id])?)
    }

    fn save_card(&self, card_id: &str, body: &SaveCardRequest) -> Result<()> {
        let _: OkResponse = self.put_json(self.url(&["card", card_id])?, body)?;
        Ok(())
    }

    fn command(&self, card_id: &str, command: RobotCommand) -> Result<CommandReport> {
        self.relay(self.url(&["card", card_id, command.as_str()])?, command)
    }
}

/// Turn a non-2xx response into `CaptainError::Api`, taking the message from
/// an `error` or `errorDescription` JSON field when present.
fn check(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("errorDescription"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.trim().to_string());
    tracing::debug!(status = status.as_u16(), %message, "api error");
    Err(CaptainError::Api {
        status: status.as_u16(),
        message,
    })
}

// ---------------------------------------------------------------------------
// InMemoryCardApi
// ---------------------------------------------------------------------------

/// Card store kept in process memory. Robot commands are recorded and
/// answered with `200 ok`.
#[derive(Debug, Default)]
pub struct InMemoryCardApi {
    cards: RefCell<HashMap<String, CardResponse>>,
    commands: RefCell<Vec<(String, RobotCommand)>>,
    failing_saves: RefCell<Option<String>>,
}

impl InMemoryCardApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, card: CardResponse) {
        self.cards.borrow_mut().insert(card.card_id.clone(), card);
    }

    pub fn card(&self, card_id: &str) -> Option<CardResponse> {
        self.cards.borrow().get(card_id).cloned()
    }

    pub fn commands(&self) -> Vec<(String, RobotCommand)> {
        self.commands.borrow().clone()
    }

    /// Make every following save fail with `message`, or succeed again with
    /// `None`.
    pub fn fail_saves(&self, message: Option<&str>) {
        *self.failing_saves.borrow_mut() = message.map(str::to_string);
    }
}

impl CardApi for InMemoryCardApi {
    fn load_card(&self, card_id: &str) -> Result<CardResponse> {
        Ok(self.card(card_id).unwrap_or_else(|| CardResponse {
            card_id: card_id.to_string(),
            ..CardResponse::default()
        }))
    }

    fn save_card(&self, card_id: &str, body: &SaveCardRequest) -> Result<()> {
        if let Some(message) = self.failing_saves.borrow().clone() {
            return Err(CaptainError::Api {
                status: 500,
                message,
            });
        }
        self.insert(CardResponse {
            card_id: card_id.to_string(),
            notes: body.notes.clone(),
            program: body.program.clone(),
        });
        Ok(())
    }

    fn command(&self, card_id: &str, command: RobotCommand) -> Result<CommandReport> {
        self.commands
            .borrow_mut()
            .push((card_id.to_string(), command));
        Ok(CommandReport {
            command,
            status: 200,
            body: "ok".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
