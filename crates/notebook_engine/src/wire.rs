use serde::Deserialize;
use serde_json::Value;

/// A validated processing event as sent by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WireEvent {
    /// The JSON `type` field.
    pub kind: Option<String>,
    pub content: String,
    pub elapsed_seconds: u64,
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed json: {0}")]
    Json(String),
    #[error("expected a json object")]
    NotAnObject,
    #[error("schema mismatch: {0}")]
    Schema(String),
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Shape check only; `null` is accepted wherever a field is optional.
#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    elapsed_seconds: Option<f64>,
    #[serde(default)]
    progress: Option<f64>,
}

/// Decodes one frame payload. Anything outside the schema is rejected.
pub fn decode_frame(payload: &str) -> Result<WireEvent, WireError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|err| WireError::Json(err.to_string()))?;
    if !value.is_object() {
        return Err(WireError::NotAnObject);
    }
    let record: WireRecord =
        serde_json::from_value(value).map_err(|err| WireError::Schema(err.to_string()))?;

    let elapsed_seconds = match record.elapsed_seconds {
        None => 0,
        Some(secs) if secs.is_finite() && secs >= 0.0 => secs.round() as u64,
        Some(secs) => {
            return Err(WireError::InvalidField {
                field: "elapsed_seconds",
                reason: format!("{secs} is not a non-negative number"),
            })
        }
    };

    let progress = match record.progress {
        None => None,
        Some(pct) if pct.is_finite() && (0.0..=100.0).contains(&pct) => Some(pct.round() as u8),
        Some(pct) => {
            return Err(WireError::InvalidField {
                field: "progress",
                reason: format!("{pct} is outside 0..=100"),
            })
        }
    };

    Ok(WireEvent {
        kind: record.kind,
        content: record.content.unwrap_or_default(),
        elapsed_seconds,
        progress,
    })
}
