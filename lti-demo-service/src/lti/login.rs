//! OIDC third-party login initiation.
//!
//! The platform starts every launch by calling the tool's login endpoint.
//! The tool answers with a redirect to the platform's authorization
//! endpoint carrying a fresh `state` and `nonce`; the platform then posts the
//! `id_token` to the launch endpoint.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::config::PlatformRegistration;
use crate::error::{ServiceError, ServiceResult};
use crate::state::LtiState;

/// Parameters of a login initiation request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInitiation {
    pub iss: Option<String>,
    pub login_hint: Option<String>,
    pub target_link_uri: Option<String>,
    pub lti_message_hint: Option<String>,
    pub client_id: Option<String>,
    pub lti_deployment_id: Option<String>,
}

impl LoginInitiation {
    /// The parameters every login initiation must carry
    pub fn required(&self) -> ServiceResult<(&str, &str, &str)> {
        let iss = require(&self.iss, "iss")?;
        let login_hint = require(&self.login_hint, "login_hint")?;
        let target_link_uri = require(&self.target_link_uri, "target_link_uri")?;
        Ok((iss, login_hint, target_link_uri))
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> ServiceResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::InvalidRequest {
            message: format!("{} is required", name),
        })
}

/// Build the authorization request URL for a pending login
pub fn authorization_redirect(
    platform: &PlatformRegistration,
    initiation: &LoginInitiation,
    state: &LtiState,
) -> ServiceResult<String> {
    let (_, login_hint, target_link_uri) = initiation.required()?;

    let mut params: Vec<(&str, &str)> = vec![
        ("scope", "openid"),
        ("response_type", "id_token"),
        ("response_mode", "form_post"),
        ("prompt", "none"),
        ("client_id", platform.client_id.as_str()),
        ("redirect_uri", target_link_uri),
        ("login_hint", login_hint),
    ];
    if let Some(hint) = initiation.lti_message_hint.as_deref() {
        params.push(("lti_message_hint", hint));
    }
    params.push(("state", state.id.as_str()));
    params.push(("nonce", state.nonce.as_str()));

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if platform.auth_login_url.contains('?') {
        '&'
    } else {
        '?'
    };
    Ok(format!("{}{}{}", platform.auth_login_url, separator, query))
}

/// Generate an unguessable identifier (32 random bytes, base64url)
pub fn generate_opaque_id() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
