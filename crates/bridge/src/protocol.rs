//! JSON messages exchanged with the page over the webview IPC channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One request posted by the page. The id is generated page-side and is
/// opaque to the host; it only has to be unique among in-flight requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcRequest {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownCommand,
    CommandFailed,
    TimedOut,
    Overloaded,
    InvalidRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Reply delivered back to the page; settles the promise stored under `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BridgeError>,
}

impl BridgeReply {
    pub fn resolved(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: true,
            value: Some(value.into()),
            error: None,
        }
    }

    pub fn rejected(id: impl Into<String>, error: BridgeError) -> Self {
        Self {
            id: id.into(),
            ok: false,
            value: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not JSON, or no string id to settle a promise against. The message
    /// can only be logged and dropped.
    #[error("unintelligible ipc message: {0}")]
    Unintelligible(String),
    /// The envelope carried a usable id but the rest of the shape was wrong,
    /// so the page promise can be rejected.
    #[error("invalid request {id:?}: {reason}")]
    Invalid { id: String, reason: String },
}

/// Parses one raw IPC text message into a request.
pub fn parse_request(raw: &str) -> Result<IpcRequest, ParseError> {
    match serde_json::from_str::<IpcRequest>(raw) {
        Ok(request) => {
            if request.id.is_empty() {
                return Err(ParseError::Unintelligible("empty request id".to_string()));
            }
            if request.command.is_empty() {
                return Err(ParseError::Invalid {
                    id: request.id,
                    reason: "empty command name".to_string(),
                });
            }
            Ok(request)
        }
        Err(err) => match recover_id(raw) {
            Some(id) => Err(ParseError::Invalid {
                id,
                reason: err.to_string(),
            }),
            None => Err(ParseError::Unintelligible(err.to_string())),
        },
    }
}

fn recover_id(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let id = value.get("id")?.as_str()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Script evaluated in the webview to settle the page-side promise.
pub fn settle_script(reply: &BridgeReply) -> Result<String, serde_json::Error> {
    // serde_json leaves U+2028/U+2029 unescaped; they are legal JSON but not
    // legal inside a JS string literal before ES2019.
    let json = serde_json::to_string(reply)?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!(
        "window.__vitrineSettle && window.__vitrineSettle({json});"
    ))
}
