//! Session state kept between the login, launch and tool requests.
//!
//! A state is created by login initiation as [`StoredState::Pending`],
//! replaced by [`StoredState::Demo`] when its launch succeeds, and read by
//! the tool pages on every later request.

mod store;

pub use store::{MemoryStateStore, StateStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Resource;
use crate::lti::{RoleSet, generate_opaque_id};

/// Protocol-level state created at login initiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtiState {
    pub id: String,
    pub nonce: String,
    pub issuer: String,
    pub client_id: String,
    pub deployment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LtiState {
    /// Create a state with a fresh opaque id and nonce
    pub fn new(issuer: String, client_id: String, deployment_id: Option<String>) -> Self {
        Self {
            id: generate_opaque_id(),
            nonce: generate_opaque_id(),
            issuer,
            client_id,
            deployment_id,
            created_at: Utc::now(),
        }
    }
}

/// What a user of the platform-wide tool needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchState {
    pub person_name: String,
    pub platform_name: String,
    pub roles: RoleSet,
}

/// What a user of the course content tool needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseLaunchState {
    pub launch: LaunchState,
    pub course_id: String,
    pub course_title: String,
    pub resource_id: String,
    pub resource: Option<Resource>,
    pub allowed_to_clear_resource: bool,
}

/// Session state of a launched demo tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoState {
    pub lti: LtiState,
    pub platform_launch: Option<LaunchState>,
    pub course_launch: Option<CourseLaunchState>,
}

impl DemoState {
    pub fn new(lti: LtiState) -> Self {
        Self {
            lti,
            platform_launch: None,
            course_launch: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.lti.id
    }
}

/// Everything the state store can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredState {
    /// Login initiated, launch not yet received
    Pending(LtiState),
    /// Launch processed
    Demo(DemoState),
}

impl StoredState {
    pub fn id(&self) -> &str {
        &self.lti().id
    }

    pub fn lti(&self) -> &LtiState {
        match self {
            StoredState::Pending(lti) => lti,
            StoredState::Demo(demo) => &demo.lti,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoredState::Pending(_) => "pending",
            StoredState::Demo(_) => "demo",
        }
    }
}
