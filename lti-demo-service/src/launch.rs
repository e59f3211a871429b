//! Launch dispatch.
//!
//! After a launch has been validated, the custom `tool_type` claim decides
//! which launch state to build and which tool page the browser is sent to.
//! Launches that name no known tool type get a diagnostic page instead.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use strum::{EnumString, IntoStaticStr};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::html::{HTML_CONTENT_TYPE, render_launch_diagnostics};
use crate::lti::LtiClaims;
use crate::state::{CourseLaunchState, DemoState, LaunchState};

/// Custom claim member selecting the tool
pub const TOOL_TYPE_CLAIM: &str = "lti.jonmaber.co.uk#tool_type";

/// Tools this service can be launched as
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ToolType {
    System,
    Course,
    CourseContent,
}

impl ToolType {
    pub fn from_claims(claims: &LtiClaims) -> Option<Self> {
        claims.custom_str(TOOL_TYPE_CLAIM)?.parse().ok()
    }

    pub fn label(self) -> &'static str {
        self.into()
    }
}

/// The single response a launch produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Send the browser to a tool page
    Redirect(String),
    /// Unrecognised tool type: show what the platform sent
    Diagnostic(String),
}

impl IntoResponse for LaunchOutcome {
    fn into_response(self) -> Response {
        match self {
            LaunchOutcome::Redirect(location) => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            LaunchOutcome::Diagnostic(html) => {
                (StatusCode::OK, [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)], html).into_response()
            }
        }
    }
}

/// Populate `state` from validated claims and decide the response
pub fn dispatch_launch(
    claims: &LtiClaims,
    state: &mut DemoState,
    resources: &Database,
    base_path: &str,
) -> ServiceResult<LaunchOutcome> {
    let Some(tool_type) = ToolType::from_claims(claims) else {
        warn!(
            state_id = %state.id(),
            tool_type = ?claims.custom_str(TOOL_TYPE_CLAIM),
            "Unrecognised tool type, rendering launch diagnostics"
        );
        metrics::counter!("ltidemo_launches_total", "tool_type" => "unrecognized").increment(1);
        return Ok(LaunchOutcome::Diagnostic(render_launch_diagnostics(
            base_path, claims,
        )));
    };

    metrics::counter!("ltidemo_launches_total", "tool_type" => tool_type.label()).increment(1);

    let outcome = match tool_type {
        ToolType::System | ToolType::Course => {
            state.platform_launch = Some(platform_launch_state(claims));
            LaunchOutcome::Redirect(tool_url(base_path, "platformresource", state.id()))
        }
        ToolType::CourseContent => {
            state.course_launch = Some(course_launch_state(claims, resources)?);
            LaunchOutcome::Redirect(tool_url(base_path, "courseresource", state.id()))
        }
    };

    info!(
        state_id = %state.id(),
        tool_type = tool_type.label(),
        "Launch dispatched"
    );

    Ok(outcome)
}

fn platform_launch_state(claims: &LtiClaims) -> LaunchState {
    LaunchState {
        person_name: claims.name().unwrap_or_default().to_string(),
        platform_name: claims.tool_platform().url.unwrap_or_default(),
        roles: claims.roles(),
    }
}

fn course_launch_state(
    claims: &LtiClaims,
    resources: &Database,
) -> ServiceResult<CourseLaunchState> {
    let launch = platform_launch_state(claims);
    let context = claims.context();
    let resource_id = claims.resource_link().id.unwrap_or_default();

    let resource = resources
        .get_resource(&launch.platform_name, &resource_id, true)?
        .ok_or_else(|| ServiceError::Internal {
            message: format!("resource {} was not created", resource_id),
        })?;

    let allowed_to_clear_resource = launch.roles.is_in_standard_instructor_role();

    Ok(CourseLaunchState {
        launch,
        course_id: context.id.unwrap_or_default(),
        course_title: context.label.unwrap_or_default(),
        resource_id,
        resource: Some(resource),
        allowed_to_clear_resource,
    })
}

/// URL of a tool page for a session state
pub fn tool_url(base_path: &str, page: &str, state_id: &str) -> String {
    format!(
        "{}/{}?state_id={}",
        base_path.trim_end_matches('/'),
        page,
        urlencoding::encode(state_id)
    )
}
