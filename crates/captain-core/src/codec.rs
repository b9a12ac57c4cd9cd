//! The card transport format: the wire program is JSON-serialized and then
//! base64-encoded (standard alphabet, padded) into the `program` field.

use crate::action::{Action, Program, WireAction};
use crate::card::{CardResponse, SaveCardRequest};
use crate::catalog::ActionCatalog;
use crate::error::{CaptainError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A card decoded from a load response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCard {
    pub program: Program,
    pub notes: String,
}

pub fn encode(program: &Program) -> Vec<WireAction> {
    program.to_wire()
}

pub fn encode_field(program: &Program) -> Result<String> {
    let json = serde_json::to_vec(&encode(program))?;
    Ok(STANDARD.encode(json))
}

pub fn save_request(program: &Program, notes: &str) -> Result<SaveCardRequest> {
    Ok(SaveCardRequest {
        notes: notes.to_string(),
        program: Some(encode_field(program)?),
    })
}

/// Decode the `program` field alone. An absent or empty field is a card that
/// was never saved and yields an empty program.
pub fn decode_field(catalog: &ActionCatalog, field: Option<&str>) -> Result<Program> {
    let Some(field) = field.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(Program::new());
    };
    let value = decode_value(field)?;
    Action::from_json_value(catalog, &value)
}

/// Decode the `program` field into wire records without checking them
/// against a catalog.
pub fn decode_wire(field: Option<&str>) -> Result<Vec<WireAction>> {
    let Some(field) = field.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(Vec::new());
    };
    let value = decode_value(field)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)
            .map_err(|e| CaptainError::MalformedProgram(e.to_string())),
        serde_json::Value::Object(_) => {
            let record: WireAction = serde_json::from_value(value)
                .map_err(|e| CaptainError::MalformedProgram(e.to_string()))?;
            Ok(vec![record])
        }
        _ => Err(CaptainError::MalformedProgram(
            "expected an action list".to_string(),
        )),
    }
}

pub fn decode(catalog: &ActionCatalog, body: &CardResponse) -> Result<DecodedCard> {
    Ok(DecodedCard {
        program: decode_field(catalog, body.program.as_deref())?,
        notes: body.notes.clone(),
    })
}

fn decode_value(field: &str) -> Result<serde_json::Value> {
    let bytes = STANDARD
        .decode(field)
        .map_err(|e| CaptainError::TransportDecode(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CaptainError::TransportDecode(format!("invalid JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
