use crate::error::{CaptainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// The instruction tags a robot understands. The variant name is also the
/// wire name (`"Action": "MoveForward"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    MoveForward,
    MoveBackward,
    Turn,
    FollowLine,
    SetTopColor,
    SetBottomColor,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::MoveForward,
            ActionKind::MoveBackward,
            ActionKind::Turn,
            ActionKind::FollowLine,
            ActionKind::SetTopColor,
            ActionKind::SetBottomColor,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::MoveForward => "MoveForward",
            ActionKind::MoveBackward => "MoveBackward",
            ActionKind::Turn => "Turn",
            ActionKind::FollowLine => "FollowLine",
            ActionKind::SetTopColor => "SetTopColor",
            ActionKind::SetBottomColor => "SetBottomColor",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = CaptainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ActionKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CaptainError::UnknownKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// One legal parameter value for an action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArgChoice {
    pub id: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub title: &'static str,
    pub color: &'static str,
    pub args: &'static [ArgChoice],
}

impl ActionSpec {
    pub fn requires_param(&self) -> bool {
        !self.args.is_empty()
    }

    pub fn accepts(&self, param: &str) -> bool {
        self.args.iter().any(|a| a.id == param)
    }

    pub fn choice(&self, param: &str) -> Option<&ArgChoice> {
        self.args.iter().find(|a| a.id == param)
    }
}

// ---------------------------------------------------------------------------
// Standard table
// ---------------------------------------------------------------------------

const DISTANCES: &[ArgChoice] = &[
    ArgChoice { id: "10cm", description: "by 10 cm" },
    ArgChoice { id: "20cm", description: "by 20 cm" },
    ArgChoice { id: "50cm", description: "by 50 cm" },
    ArgChoice { id: "UntilWall", description: "until a wall" },
    ArgChoice { id: "UntilBlackFloor", description: "until black floor" },
    ArgChoice { id: "UntilWhiteFloor", description: "until white floor" },
];

const ANGLES: &[ArgChoice] = &[
    ArgChoice { id: "Right45", description: "45° right" },
    ArgChoice { id: "Left45", description: "45° left" },
    ArgChoice { id: "Right90", description: "90° right" },
    ArgChoice { id: "Left90", description: "90° left" },
    ArgChoice { id: "Right180", description: "half turn" },
    ArgChoice { id: "Right135", description: "135° right" },
    ArgChoice { id: "Left135", description: "135° left" },
];

const LINE_DISTANCES: &[ArgChoice] = &[
    ArgChoice { id: "10cm", description: "for 10 cm" },
    ArgChoice { id: "20cm", description: "for 20 cm" },
    ArgChoice { id: "50cm", description: "for 50 cm" },
    ArgChoice { id: "UntilWall", description: "until a wall" },
];

const COLORS: &[ArgChoice] = &[
    ArgChoice { id: "off", description: "off" },
    ArgChoice { id: "red", description: "red" },
    ArgChoice { id: "blue", description: "blue" },
    ArgChoice { id: "green", description: "green" },
    ArgChoice { id: "pink", description: "pink" },
    ArgChoice { id: "orange", description: "orange" },
    ArgChoice { id: "white", description: "white" },
];

pub const STANDARD_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        kind: ActionKind::MoveForward,
        title: "move forward",
        color: "#FFC000",
        args: DISTANCES,
    },
    ActionSpec {
        kind: ActionKind::MoveBackward,
        title: "move backward",
        color: "#70AD47",
        args: DISTANCES,
    },
    ActionSpec {
        kind: ActionKind::Turn,
        title: "turn",
        color: "#E76D19",
        args: ANGLES,
    },
    ActionSpec {
        kind: ActionKind::FollowLine,
        title: "follow the line",
        color: "#41719C",
        args: LINE_DISTANCES,
    },
    ActionSpec {
        kind: ActionKind::SetTopColor,
        title: "top light",
        color: "#AA00FF",
        args: COLORS,
    },
    ActionSpec {
        kind: ActionKind::SetBottomColor,
        title: "bottom light",
        color: "#FF4081",
        args: COLORS,
    },
];

// ---------------------------------------------------------------------------
// ActionCatalog
// ---------------------------------------------------------------------------

/// Registry of the action kinds available to a program, in registration
/// order. Stateless once built.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    specs: &'static [ActionSpec],
}

impl ActionCatalog {
    pub fn standard() -> Self {
        Self {
            specs: STANDARD_ACTIONS,
        }
    }

    /// Build a catalog from a static table. Each kind may appear once.
    pub fn from_table(specs: &'static [ActionSpec]) -> Result<Self> {
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.kind == spec.kind) {
                return Err(CaptainError::InvalidCatalog(format!(
                    "action kind {} registered twice",
                    spec.kind
                )));
            }
        }
        Ok(Self { specs })
    }

    pub fn list_available(&self) -> Vec<ActionKind> {
        self.specs.iter().map(|s| s.kind).collect()
    }

    pub fn specs(&self) -> &'static [ActionSpec] {
        self.specs
    }

    pub fn spec_of(&self, kind: ActionKind) -> Result<&'static ActionSpec> {
        self.specs
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| CaptainError::UnknownKind(kind.to_string()))
    }

    /// Resolve a wire name such as `"Turn"`.
    pub fn spec_of_name(&self, name: &str) -> Result<&'static ActionSpec> {
        let kind: ActionKind = name.parse()?;
        self.spec_of(kind)
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
