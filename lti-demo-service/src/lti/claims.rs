//! Typed access to the claims of a validated launch.
//!
//! The launch token carries a JSON object whose well-known members are
//! namespaced by LTI claim URIs. [`LtiClaims`] keeps the raw map (the
//! diagnostic page dumps every member) and decodes the sections the tool
//! understands on demand.

use serde::{Deserialize, Deserializer};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::roles::RoleSet;

pub const CLAIM_TOOL_PLATFORM: &str = "https://purl.imsglobal.org/spec/lti/claim/tool_platform";
pub const CLAIM_CONTEXT: &str = "https://purl.imsglobal.org/spec/lti/claim/context";
pub const CLAIM_RESOURCE_LINK: &str = "https://purl.imsglobal.org/spec/lti/claim/resource_link";
pub const CLAIM_ROLES: &str = "https://purl.imsglobal.org/spec/lti/claim/roles";
pub const CLAIM_CUSTOM: &str = "https://purl.imsglobal.org/spec/lti/claim/custom";
pub const CLAIM_DEPLOYMENT_ID: &str = "https://purl.imsglobal.org/spec/lti/claim/deployment_id";

/// The tool platform claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolPlatformClaim {
    pub guid: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub product_family_code: Option<String>,
    pub version: Option<String>,
}

/// The context (course) claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextClaim {
    pub id: Option<String>,
    pub label: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type", deserialize_with = "string_or_list")]
    pub types: Vec<String>,
}

impl ContextClaim {
    pub fn first_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }
}

/// Accept a single string where a list of strings is expected.
/// Anything else decodes as an empty list so the rest of the section survives.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Other(Value),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
        OneOrMany::Other(value) => {
            debug!(value = %value, "Ignoring malformed string list");
            Vec::new()
        }
    })
}

/// The resource link claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceLinkClaim {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Claim set of a validated launch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LtiClaims {
    claims: Map<String, Value>,
}

impl LtiClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Raw value of any claim
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// Claim names in ascending lexicographic order
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.claims.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.claims.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.get_str(CLAIM_DEPLOYMENT_ID)
    }

    pub fn tool_platform(&self) -> ToolPlatformClaim {
        self.section(CLAIM_TOOL_PLATFORM)
    }

    pub fn context(&self) -> ContextClaim {
        self.section(CLAIM_CONTEXT)
    }

    pub fn resource_link(&self) -> ResourceLinkClaim {
        self.section(CLAIM_RESOURCE_LINK)
    }

    pub fn roles(&self) -> RoleSet {
        self.section(CLAIM_ROLES)
    }

    /// A string-valued member of the custom claim
    pub fn custom_str(&self, key: &str) -> Option<&str> {
        self.claims
            .get(CLAIM_CUSTOM)
            .and_then(Value::as_object)
            .and_then(|custom| custom.get(key))
            .and_then(Value::as_str)
    }

    fn section<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.claims.get(key) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                debug!(claim = key, error = %e, "Ignoring malformed claim");
                T::default()
            }),
            None => T::default(),
        }
    }
}

/// Human-readable rendering of a claim value: strings bare, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
