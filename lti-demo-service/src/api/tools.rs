//! Tool pages reached after a launch.
//!
//! Every page is addressed by the `state_id` of a launched session, given in
//! the query string or, for POST, the form body. The query string wins when
//! both carry one.

use axum::{
    Form,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{AppState, html_response, server_name};
use crate::error::{ServiceError, ServiceResult};
use crate::html::{render_course_resource, render_platform_resource};
use crate::launch::tool_url;
use crate::state::{DemoState, StoredState};

#[derive(Debug, Default, Deserialize)]
pub struct StateIdParams {
    pub state_id: Option<String>,
}

/// Resolve the launched session a tool request refers to
pub(crate) fn lookup_state(app: &AppState, state_id: Option<&str>) -> ServiceResult<DemoState> {
    let result = find_demo_state(app, state_id);
    if let Err(e) = &result {
        debug!(state_id = ?state_id, error = %e, "State lookup failed");
        metrics::counter!("ltidemo_state_lookup_failures_total").increment(1);
    }
    result
}

fn find_demo_state(app: &AppState, state_id: Option<&str>) -> ServiceResult<DemoState> {
    let state_id = state_id
        .filter(|id| !id.is_empty())
        .ok_or(ServiceError::MissingStateId)?;

    match app.states.get_state(state_id)? {
        Some(StoredState::Demo(demo)) => Ok(demo),
        Some(other) => Err(ServiceError::WrongStateKind { kind: other.kind() }),
        None => Err(ServiceError::StateNotFound {
            state_id: state_id.to_string(),
        }),
    }
}

fn state_id_param(
    query: Result<Query<StateIdParams>, QueryRejection>,
    form: Option<String>,
) -> Option<String> {
    query
        .ok()
        .and_then(|Query(p)| p.state_id)
        .filter(|id| !id.is_empty())
        .or(form)
}

fn form_state_id(form: Result<Form<StateIdParams>, FormRejection>) -> Option<String> {
    form.ok().and_then(|Form(p)| p.state_id)
}

/// Page of the platform-wide tool
pub async fn platform_resource_handler(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<StateIdParams>, QueryRejection>,
    form: Result<Form<StateIdParams>, FormRejection>,
) -> ServiceResult<Response> {
    let state_id = state_id_param(query, form_state_id(form));
    let demo = lookup_state(&app, state_id.as_deref())?;
    let launch = demo
        .platform_launch
        .as_ref()
        .ok_or(ServiceError::LaunchDataNotFound)?;

    Ok(html_response(render_platform_resource(
        &server_name(&headers),
        launch,
    )))
}

/// Page of the course content tool
pub async fn course_resource_handler(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<StateIdParams>, QueryRejection>,
    form: Result<Form<StateIdParams>, FormRejection>,
) -> ServiceResult<Response> {
    let state_id = state_id_param(query, form_state_id(form));
    let mut demo = lookup_state(&app, state_id.as_deref())?;
    let state_id = demo.id().to_string();
    let course = demo
        .course_launch
        .as_mut()
        .ok_or(ServiceError::LaunchDataNotFound)?;

    // The session only caches the resource; render the stored copy
    let cached_id = course.resource.as_ref().map(|r| r.id.clone());
    if let Some(current) = cached_id
        .map(|id| app.db.get_resource_by_id(&id))
        .transpose()?
        .flatten()
    {
        course.resource = Some(current);
    }

    Ok(html_response(render_course_resource(
        &server_name(&headers),
        &app.config.server.base_path,
        &state_id,
        course,
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateResourceForm {
    pub state_id: Option<String>,
    pub action: Option<String>,
    pub content: Option<String>,
}

/// Save or clear the content of the resource bound to a course launch
pub async fn update_resource_handler(
    State(app): State<Arc<AppState>>,
    query: Result<Query<StateIdParams>, QueryRejection>,
    Form(form): Form<UpdateResourceForm>,
) -> ServiceResult<Response> {
    let state_id = state_id_param(query, form.state_id);
    let mut demo = lookup_state(&app, state_id.as_deref())?;
    let course = demo
        .course_launch
        .as_mut()
        .ok_or(ServiceError::LaunchDataNotFound)?;
    let resource_id = course
        .resource
        .as_ref()
        .map(|r| r.id.clone())
        .ok_or(ServiceError::LaunchDataNotFound)?;

    let content = match form.action.as_deref() {
        Some("save") => Some(form.content.unwrap_or_default()),
        Some("clear") if course.allowed_to_clear_resource => None,
        Some("clear") => {
            return Err(ServiceError::Forbidden {
                action: "clear".to_string(),
            });
        }
        other => {
            return Err(ServiceError::InvalidRequest {
                message: format!("unsupported action {:?}", other.unwrap_or_default()),
            });
        }
    };

    let updated = app
        .db
        .set_resource_content(&resource_id, content.as_deref())?
        .ok_or(ServiceError::LaunchDataNotFound)?;
    info!(
        resource = %updated.id,
        cleared = content.is_none(),
        "Resource content updated"
    );
    // Last write wins on the cached copy; the course page re-reads the database
    course.resource = Some(updated);

    let location = tool_url(&app.config.server.base_path, "courseresource", demo.id());
    app.states.put_state(StoredState::Demo(demo))?;

    Ok(Redirect::to(&location).into_response())
}
