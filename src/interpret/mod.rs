//! Response interpretation.
//!
//! Turns a [`BackendResponse`] into either a decoded success payload or a
//! [`CommandError`]. Status handling is uniform: only `200` is success and
//! every other code becomes [`CommandError::RemoteRejected`], which
//! [`crate::commands::render_error`] maps to chat text.

pub mod friends;
pub mod metrics;
pub mod permission;
pub mod tickets;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::BackendResponse;
use crate::error::CommandError;

pub const TOKEN_INVALID_TEXT: &str = "请求的Token缺失或不合法，请检查权限。";
pub const BANNED_TEXT: &str = "该用户已被封禁，请联系管理员。";
pub const SERVER_ERROR_TEXT: &str = "服务器内部错误";

/// Pass a `200` through; anything else becomes a rejection.
pub fn expect_ok(response: BackendResponse) -> Result<BackendResponse, CommandError> {
    if response.is_ok() {
        return Ok(response);
    }
    tracing::warn!(status = response.status, "Turbo backend rejected request");
    let message = if response.status == 500 {
        response.message_field()
    } else {
        None
    };
    Err(CommandError::RemoteRejected {
        status: response.status,
        message,
    })
}

/// Status text shared by every command, or `None` for the codes whose
/// wording depends on the command (400, 403 and unlisted codes).
pub fn shared_status_text(status: u16, message: Option<&str>) -> Option<String> {
    match status {
        401 => Some(TOKEN_INVALID_TEXT.to_string()),
        410 => Some(BANNED_TEXT.to_string()),
        500 => Some(message.unwrap_or(SERVER_ERROR_TEXT).to_string()),
        _ => None,
    }
}

/// Wrapped form of a body: `{isSuccess, data}`.
#[derive(Debug, Deserialize)]
struct Wrapped<W> {
    #[serde(rename = "isSuccess")]
    is_success: bool,
    data: Option<W>,
}

/// Outcome of [`decode_envelope`].
#[derive(Debug, PartialEq)]
pub enum Decoded<W, F> {
    Wrapped(W),
    Flat(F),
}

/// Decode a body that is either wrapped in `{isSuccess, data}` or returned
/// flat.
///
/// A boolean `isSuccess` selects the wrapped form, and a wrapped body that
/// fails to decode is a validation error. The flat form is tried only when
/// `isSuccess` is absent or not a boolean.
pub fn decode_envelope<W, F>(response: &BackendResponse) -> Result<Decoded<W, F>, CommandError>
where
    W: DeserializeOwned,
    F: DeserializeOwned,
{
    let value: Value = response.json()?;
    if !matches!(value.get("isSuccess"), Some(Value::Bool(_))) {
        return serde_json::from_value(value)
            .map(Decoded::Flat)
            .map_err(|e| CommandError::Validation(format!("无法解析响应数据：{e}")));
    }

    let wrapped: Wrapped<W> = serde_json::from_value(value)
        .map_err(|e| CommandError::Validation(format!("无法解析响应数据：{e}")))?;
    if !wrapped.is_success {
        return Err(CommandError::Validation(
            "返回响应中isSuccess为false".to_string(),
        ));
    }
    wrapped
        .data
        .map(Decoded::Wrapped)
        .ok_or_else(|| CommandError::Validation("返回的数据中不包含data信息".to_string()))
}

/// Bind response: `{botKey}` or `{isSuccess, data: {botKey}}`.
#[derive(Debug, Deserialize)]
pub struct BindPayload {
    #[serde(rename = "botKey")]
    pub bot_key: Option<String>,
}

/// Pull the issued bot key out of a successful bind response.
pub fn bind_key(response: &BackendResponse) -> Result<String, CommandError> {
    let payload = match decode_envelope::<BindPayload, BindPayload>(response)? {
        Decoded::Wrapped(p) | Decoded::Flat(p) => p,
    };
    payload
        .bot_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| CommandError::Validation("返回响应中缺少botKey".to_string()))
}

/// Decode the HTML entities the backend leaves in free-text fields.
pub fn html_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
