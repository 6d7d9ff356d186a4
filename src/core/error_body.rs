//! Translation of Watson error payloads into [`WatsonError`].

use crate::core::mapping::lookup;
use crate::utils::error::WatsonError;
use serde_json::Value;

fn as_code(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn service_error(domain: &str, code: u16, message: String, recovery: Option<String>) -> WatsonError {
    WatsonError::Service {
        domain: domain.to_string(),
        code,
        message,
        recovery,
    }
}

/// Matches the known error shapes in order; the first one that fits wins.
fn from_value(domain: &str, status: u16, value: &Value) -> Option<WatsonError> {
    let text = |key: &str| as_text(lookup(value, key));

    if let (Some(status_text), Some(info)) = (text("status"), text("statusInfo")) {
        return Some(service_error(domain, status, status_text, Some(info)));
    }

    if let (Some(message), Some(code)) = (text("error"), value.get("code").and_then(as_code)) {
        return Some(service_error(domain, code, message, None));
    }

    if let Some(nested) = value.get("error").filter(|e| e.is_object()) {
        let code = nested.get("code").and_then(as_code).unwrap_or(status);
        let message = as_text(nested.get("description"))
            .or_else(|| as_text(nested.get("message")))
            .unwrap_or_else(|| nested.to_string());
        return Some(service_error(domain, code, message, None));
    }

    if let Some(message) = text("error_message") {
        let code = value.get("error_code").and_then(as_code).unwrap_or(status);
        return Some(service_error(domain, code, message, None));
    }

    if let (Some(message), Some(description)) = (text("error"), text("description")) {
        return Some(service_error(domain, status, message, Some(description)));
    }

    if let Some(description) = text("description") {
        return Some(service_error(domain, status, description, None));
    }

    text("error").map(|message| service_error(domain, status, message, None))
}

/// Builds the error for a non-2xx response.
///
/// Recognised JSON bodies become [`WatsonError::Service`]; anything else is
/// reported as [`WatsonError::Http`] with the raw body.
pub fn decode_error_body(domain: &str, status: u16, body: &[u8]) -> WatsonError {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| from_value(domain, status, &value))
        .unwrap_or_else(|| WatsonError::Http {
            domain: domain.to_string(),
            code: status,
            body: String::from_utf8_lossy(body).into_owned(),
        })
}

/// AlchemyAPI reports failures inside 2xx responses as `"status": "ERROR"`.
pub fn alchemy_status_error(domain: &str, value: &Value) -> Option<WatsonError> {
    match value.get("status").and_then(Value::as_str) {
        Some("ERROR") => {
            let info = as_text(value.get("statusInfo"))
                .unwrap_or_else(|| "unknown AlchemyAPI error".to_string());
            Some(service_error(domain, 400, "ERROR".to_string(), Some(info)))
        }
        _ => None,
    }
}
