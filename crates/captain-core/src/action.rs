use crate::catalog::{ActionCatalog, ActionKind, ActionSpec};
use crate::error::{CaptainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// WireAction
// ---------------------------------------------------------------------------

/// Wire form of one action: `{"Action": "Turn", "Param": "Right90"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAction {
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Param", default)]
    pub param: Option<String>,
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One instruction in a program. `param`, when set, is always one of the
/// argument ids the catalog lists for `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    kind: ActionKind,
    param: Option<String>,
}

impl Action {
    pub fn new(catalog: &ActionCatalog, kind: ActionKind, param: Option<&str>) -> Result<Self> {
        let spec = catalog.spec_of(kind)?;
        if let Some(p) = param {
            check_param(spec, p)?;
        }
        Ok(Self {
            kind,
            param: param.map(str::to_string),
        })
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn spec(&self, catalog: &ActionCatalog) -> Result<&'static ActionSpec> {
        catalog.spec_of(self.kind)
    }

    pub fn title(&self, catalog: &ActionCatalog) -> Result<&'static str> {
        Ok(self.spec(catalog)?.title)
    }

    pub fn color(&self, catalog: &ActionCatalog) -> Result<&'static str> {
        Ok(self.spec(catalog)?.color)
    }

    /// Human label of the chosen parameter, if any.
    pub fn param_description(&self, catalog: &ActionCatalog) -> Option<&'static str> {
        let spec = self.spec(catalog).ok()?;
        let param = self.param.as_deref()?;
        spec.choice(param).map(|c| c.description)
    }

    /// Replace the parameter, validating it against the catalog first.
    pub(crate) fn with_param(&self, catalog: &ActionCatalog, param: Option<&str>) -> Result<Self> {
        Self::new(catalog, self.kind, param)
    }

    pub fn to_wire(&self) -> WireAction {
        WireAction {
            action: self.kind.to_string(),
            param: self.param.clone(),
        }
    }

    pub fn from_wire(catalog: &ActionCatalog, wire: &WireAction) -> Result<Self> {
        let spec = catalog
            .spec_of_name(&wire.action)
            .map_err(|_| CaptainError::MalformedProgram(format!("unknown action '{}'", wire.action)))?;
        if let Some(p) = wire.param.as_deref() {
            if !spec.accepts(p) {
                return Err(CaptainError::MalformedProgram(format!(
                    "parameter '{}' is not valid for {}",
                    p, spec.kind
                )));
            }
        }
        Ok(Self {
            kind: spec.kind,
            param: wire.param.clone(),
        })
    }

    /// Decode a pre-parsed JSON value: an object yields one action, an array
    /// yields the whole sequence.
    pub fn from_json_value(catalog: &ActionCatalog, value: &serde_json::Value) -> Result<Program> {
        match value {
            serde_json::Value::Array(items) => {
                let mut actions = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let action = decode_record(catalog, item)
                        .map_err(|e| CaptainError::MalformedProgram(format!("record {i}: {}", strip_prefix(&e))))?;
                    actions.push(action);
                }
                Ok(Program::from(actions))
            }
            serde_json::Value::Object(_) => Ok(Program::from(vec![decode_record(catalog, value)?])),
            other => Err(CaptainError::MalformedProgram(format!(
                "expected an action list, got {}",
                json_type(other)
            ))),
        }
    }

    pub fn from_json_str(catalog: &ActionCatalog, json: &str) -> Result<Program> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CaptainError::MalformedProgram(format!("invalid JSON: {e}")))?;
        Self::from_json_value(catalog, &value)
    }

    pub fn from_wire_list(catalog: &ActionCatalog, wire: &[WireAction]) -> Result<Program> {
        let mut actions = Vec::with_capacity(wire.len());
        for (i, w) in wire.iter().enumerate() {
            let action = Self::from_wire(catalog, w)
                .map_err(|e| CaptainError::MalformedProgram(format!("record {i}: {}", strip_prefix(&e))))?;
            actions.push(action);
        }
        Ok(Program::from(actions))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(p) => write!(f, "{}({})", self.kind, p),
            None => write!(f, "{}", self.kind),
        }
    }
}

fn check_param(spec: &ActionSpec, param: &str) -> Result<()> {
    if spec.accepts(param) {
        Ok(())
    } else {
        Err(CaptainError::InvalidParam {
            kind: spec.kind.to_string(),
            param: param.to_string(),
        })
    }
}

fn decode_record(catalog: &ActionCatalog, value: &serde_json::Value) -> Result<Action> {
    if value.get("Action").is_none() {
        return Err(CaptainError::MalformedProgram(
            "record is missing the 'Action' field".to_string(),
        ));
    }
    let wire: WireAction = serde_json::from_value(value.clone())
        .map_err(|e| CaptainError::MalformedProgram(e.to_string()))?;
    Action::from_wire(catalog, &wire)
}

fn strip_prefix(err: &CaptainError) -> String {
    match err {
        CaptainError::MalformedProgram(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

/// Ordered action sequence; order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    actions: Vec<Action>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    pub fn to_wire(&self) -> Vec<WireAction> {
        self.actions.iter().map(Action::to_wire).collect()
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub(crate) fn pop(&mut self) -> Option<Action> {
        self.actions.pop()
    }

    pub(crate) fn insert(&mut self, index: usize, action: Action) {
        self.actions.insert(index, action);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Action {
        self.actions.remove(index)
    }

    pub(crate) fn replace(&mut self, index: usize, action: Action) -> Action {
        std::mem::replace(&mut self.actions[index], action)
    }
}

impl From<Vec<Action>> for Program {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
