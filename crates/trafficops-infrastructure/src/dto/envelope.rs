//! The `{success: true, ...} | {success: false, error}` response envelope.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use trafficops_core::error::{Result, TrafficOpsError};

#[derive(Debug, Deserialize)]
struct Envelope {
    /// Some error paths omit the key entirely; absence counts as failure
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Validates the envelope of a response body and decodes the payload.
///
/// # Returns
///
/// - `Ok(T)`: `success` was `true` and the body matched `T`
/// - `Err(ServerRejection)`: `success` was missing or `false`; carries the
///   server `error` text, or `Request failed with HTTP <status>`
/// - `Err(Serialization)`: a successful body that does not match `T`
pub fn parse_envelope<T: DeserializeOwned>(http_status: u16, body: &str) -> Result<T> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&http_status) => {
            return Err(fallback_rejection(http_status));
        }
        Err(e) => return Err(e.into()),
    };

    let envelope = Envelope::deserialize(&value).unwrap_or(Envelope {
        success: None,
        error: None,
    });

    if envelope.success != Some(true) {
        return Err(match envelope.error.filter(|e| !e.trim().is_empty()) {
            Some(message) => TrafficOpsError::rejected(message),
            None => fallback_rejection(http_status),
        });
    }

    Ok(serde_json::from_value(value)?)
}

fn fallback_rejection(http_status: u16) -> TrafficOpsError {
    TrafficOpsError::rejected(format!("Request failed with HTTP {}", http_status))
}
