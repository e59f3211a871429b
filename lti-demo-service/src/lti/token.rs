//! Turning a launch `id_token` into validated claims.
//!
//! The launch endpoint never inspects the token itself; it hands the token
//! and the pending session state to a [`LaunchValidator`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::error::{ServiceError, ServiceResult};
use crate::state::LtiState;

use super::claims::LtiClaims;

/// Produces validated claims for a launch bound to a pending login state
pub trait LaunchValidator: Send + Sync {
    fn validate(&self, id_token: &str, state: &LtiState) -> ServiceResult<LtiClaims>;
}

/// Decodes the token payload and checks its binding to the login state.
///
/// Checks `nonce`, `iss` and `aud` against the state created at login.
/// Does not verify the token signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedTokenDecoder;

impl LaunchValidator for UnverifiedTokenDecoder {
    fn validate(&self, id_token: &str, state: &LtiState) -> ServiceResult<LtiClaims> {
        let claims = decode_payload(id_token)?;

        match claims.get("nonce").and_then(Value::as_str) {
            Some(nonce) if nonce == state.nonce => {}
            Some(_) => return Err(invalid("nonce does not match login state")),
            None => return Err(invalid("nonce claim missing")),
        }

        match claims.get("iss").and_then(Value::as_str) {
            Some(iss) if iss == state.issuer => {}
            Some(iss) => return Err(invalid(format!("unexpected issuer {}", iss))),
            None => return Err(invalid("iss claim missing")),
        }

        if !audience_contains(claims.get("aud"), &state.client_id) {
            return Err(invalid(format!(
                "audience does not include client {}",
                state.client_id
            )));
        }

        Ok(LtiClaims::new(claims))
    }
}

fn decode_payload(id_token: &str) -> ServiceResult<Map<String, Value>> {
    let mut parts = id_token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(invalid("id_token is not a compact JWT")),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| invalid(format!("id_token payload is not base64url: {}", e)))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid("id_token payload is not a JSON object")),
        Err(e) => Err(invalid(format!("id_token payload is not JSON: {}", e))),
    }
}

fn audience_contains(aud: Option<&Value>, client_id: &str) -> bool {
    match aud {
        Some(Value::String(aud)) => aud == client_id,
        Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(client_id)),
        _ => false,
    }
}

fn invalid(message: impl Into<String>) -> ServiceError {
    ServiceError::InvalidLaunch {
        message: message.into(),
    }
}
