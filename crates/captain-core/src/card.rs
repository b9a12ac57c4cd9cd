use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Card bodies
// ---------------------------------------------------------------------------

/// Body of `GET card/{cardId}`. `program` is base64(JSON(wire program)) and
/// is absent for a card that was never saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub card_id: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

/// Body of `PUT card/{cardId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveCardRequest {
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

/// A card as kept by the card store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCard {
    pub card_id: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub program: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCard {
    pub fn to_response(&self) -> CardResponse {
        CardResponse {
            card_id: self.card_id.clone(),
            notes: self.notes.clone(),
            program: self.program.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub result: String,
}

impl OkResponse {
    pub fn done() -> Self {
        Self {
            result: "done".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RobotCommand
// ---------------------------------------------------------------------------

/// Robot control endpoints reachable through a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotCommand {
    Run,
    Stop,
    Upload,
    Ping,
}

impl RobotCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            RobotCommand::Run => "run",
            RobotCommand::Stop => "stop",
            RobotCommand::Upload => "upload",
            RobotCommand::Ping => "ping",
        }
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RobotCommand {
    type Err = crate::error::CaptainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(RobotCommand::Run),
            "stop" => Ok(RobotCommand::Stop),
            "upload" => Ok(RobotCommand::Upload),
            "ping" => Ok(RobotCommand::Ping),
            other => Err(crate::error::CaptainError::UnknownCommand(other.to_string())),
        }
    }
}

/// What the robot answered to a forwarded command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    pub command: RobotCommand,
    pub status: u16,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub name: String,
    pub url: String,
    /// Empty when the robot is not associated with any card.
    #[serde(default)]
    pub card_id: String,
}

impl Robot {
    pub fn is_free(&self) -> bool {
        self.card_id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRobotRequest {
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotFilter {
    #[default]
    All,
    Used,
    Free,
}

impl RobotFilter {
    pub fn matches(self, robot: &Robot) -> bool {
        match self {
            RobotFilter::All => true,
            RobotFilter::Used => !robot.is_free(),
            RobotFilter::Free => robot.is_free(),
        }
    }

    pub fn apply(self, robots: Vec<Robot>) -> Vec<Robot> {
        robots.into_iter().filter(|r| self.matches(r)).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RobotFilter::All => "all",
            RobotFilter::Used => "used",
            RobotFilter::Free => "free",
        }
    }
}

impl std::str::FromStr for RobotFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(RobotFilter::All),
            "used" => Ok(RobotFilter::Used),
            "free" => Ok(RobotFilter::Free),
            other => Err(format!(
                "unknown robot filter '{other}': valid values are all, used, free"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
