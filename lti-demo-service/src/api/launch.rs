//! Login initiation and launch endpoints.

use axum::{
    Form,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::launch::{LaunchOutcome, dispatch_launch};
use crate::lti::{LoginInitiation, authorization_redirect};
use crate::state::{DemoState, LtiState, StoredState};

/// Start an OIDC login: remember a pending state and send the browser to the platform
pub async fn login_handler(
    State(app): State<Arc<AppState>>,
    Form(initiation): Form<LoginInitiation>,
) -> ServiceResult<Response> {
    let (iss, _, _) = initiation.required()?;

    let platform = app
        .config
        .lti
        .find_platform(iss, initiation.client_id.as_deref())
        .ok_or_else(|| ServiceError::UnknownPlatform {
            issuer: iss.to_string(),
        })?;

    let state = LtiState::new(
        platform.issuer.clone(),
        platform.client_id.clone(),
        initiation.lti_deployment_id.clone(),
    );
    let location = authorization_redirect(platform, &initiation, &state)?;

    info!(
        state_id = %state.id,
        issuer = %platform.issuer,
        "Login initiated"
    );
    app.states.put_state(StoredState::Pending(state))?;
    metrics::counter!("ltidemo_logins_total").increment(1);

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Parameters the platform posts to the launch endpoint
#[derive(Debug, Deserialize)]
pub struct LaunchForm {
    pub id_token: Option<String>,
    pub state: Option<String>,
}

/// Complete a launch: validate the token against its pending state and dispatch
pub async fn launch_handler(
    State(app): State<Arc<AppState>>,
    Form(form): Form<LaunchForm>,
) -> ServiceResult<LaunchOutcome> {
    let id_token = form
        .id_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::InvalidRequest {
            message: "id_token is required".to_string(),
        })?;
    let state_id = form
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::InvalidRequest {
            message: "state is required".to_string(),
        })?;

    // Taking the state makes it single-use
    let lti = match app.states.take_state(&state_id)? {
        Some(StoredState::Pending(lti)) => lti,
        Some(launched @ StoredState::Demo(_)) => {
            app.states.put_state(launched)?;
            return Err(ServiceError::WrongLaunchStateKind);
        }
        None => {
            metrics::counter!("ltidemo_state_lookup_failures_total").increment(1);
            return Err(ServiceError::StateNotFound { state_id });
        }
    };

    let claims = app.validator.validate(&id_token, &lti)?;
    debug!(state_id = %lti.id, claims = claims.sorted_keys().len(), "Launch token accepted");

    let platform = app
        .config
        .lti
        .find_platform(&lti.issuer, Some(&lti.client_id))
        .ok_or_else(|| ServiceError::UnknownPlatform {
            issuer: lti.issuer.clone(),
        })?;
    let deployment_id = claims.deployment_id();
    if !platform.accepts_deployment(deployment_id) {
        warn!(
            state_id = %lti.id,
            deployment_id = ?deployment_id,
            "Launch from unregistered deployment"
        );
        return Err(ServiceError::InvalidLaunch {
            message: format!("deployment {} is not registered", deployment_id.unwrap_or("(none)")),
        });
    }
    // A deployment named at login must be the one that launches
    if let Some(expected) = lti.deployment_id.as_deref().filter(|d| deployment_id != Some(*d)) {
        warn!(
            state_id = %lti.id,
            expected = %expected,
            deployment_id = ?deployment_id,
            "Launch deployment differs from login"
        );
        return Err(ServiceError::InvalidLaunch {
            message: format!(
                "deployment {} does not match login deployment {}",
                deployment_id.unwrap_or("(none)"),
                expected
            ),
        });
    }

    let mut demo = DemoState::new(lti);
    let outcome = dispatch_launch(&claims, &mut demo, &app.db, &app.config.server.base_path)?;

    app.states.put_state(StoredState::Demo(demo))?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::*;
    use crate::launch::TOOL_TYPE_CLAIM;
    use crate::lti::claims::{
        CLAIM_CONTEXT, CLAIM_CUSTOM, CLAIM_DEPLOYMENT_ID, CLAIM_RESOURCE_LINK, CLAIM_ROLES,
        CLAIM_TOOL_PLATFORM,
    };
    use crate::lti::token::tests::encode_token;
    use serde_json::{Value, json};

    fn login_query() -> String {
        format!(
            "/login?iss={}&login_hint=user-1&target_link_uri={}&client_id={}",
            urlencoding::encode(ISSUER),
            urlencoding::encode("https://tool.example/launch"),
            CLIENT_ID
        )
    }

    /// Run login initiation and return the pending state
    async fn login(app: &Arc<AppState>) -> LtiState {
        login_with(app, &login_query()).await
    }

    async fn login_with(app: &Arc<AppState>, uri: &str) -> LtiState {
        let (status, headers, _) = send(app, get(uri)).await;
        assert_eq!(status, StatusCode::FOUND);

        let location = headers[header::LOCATION].to_str().unwrap();
        let state_id = location
            .split('&')
            .find_map(|p| p.strip_prefix("state="))
            .unwrap();
        let state_id = urlencoding::decode(state_id).unwrap().into_owned();

        match app.states.get_state(&state_id).unwrap() {
            Some(StoredState::Pending(lti)) => lti,
            other => panic!("Expected pending state, got {:?}", other),
        }
    }

    fn token_for(lti: &LtiState, tool_type: Option<&str>) -> String {
        let mut payload = json!({
            "iss": ISSUER,
            "aud": CLIENT_ID,
            "nonce": lti.nonce,
            "name": "Ada Lovelace",
            CLAIM_DEPLOYMENT_ID: "dep-1",
            CLAIM_TOOL_PLATFORM: { "guid": "g-1", "url": ISSUER },
            CLAIM_CONTEXT: { "id": "course-42", "label": "CS101" },
            CLAIM_RESOURCE_LINK: { "id": "link-7" },
            CLAIM_ROLES: ["http://purl.imsglobal.org/vocab/lis/v2/membership#Learner"],
            CLAIM_CUSTOM: {}
        });
        if let Some(tool_type) = tool_type {
            payload[CLAIM_CUSTOM][TOOL_TYPE_CLAIM] = Value::String(tool_type.to_string());
        }
        encode_token(&payload)
    }

    fn launch_body(token: &str, state_id: &str) -> String {
        format!(
            "id_token={}&state={}",
            urlencoding::encode(token),
            urlencoding::encode(state_id)
        )
    }

    #[tokio::test]
    async fn test_login_redirects_to_platform() {
        let (_dir, app) = test_app();
        let lti = login(&app).await;

        assert_eq!(lti.issuer, ISSUER);
        assert_eq!(lti.client_id, CLIENT_ID);
        assert_eq!(app.states.len(), 1);
    }

    #[tokio::test]
    async fn test_login_unknown_platform() {
        let (_dir, app) = test_app();
        let uri = "/login?iss=https%3A%2F%2Fother.example&login_hint=u&target_link_uri=x";
        let (status, _, body) = send(&app, get(uri)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("other.example"));
        assert_eq!(app.states.len(), 0);
    }

    #[tokio::test]
    async fn test_login_missing_parameters() {
        let (_dir, app) = test_app();
        let (status, _, body) = send(&app, get("/login?iss=x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("login_hint"));
    }

    #[tokio::test]
    async fn test_platform_launch_redirects_to_tool() {
        let (_dir, app) = test_app();
        let lti = login(&app).await;
        let token = token_for(&lti, Some("system"));

        let (status, headers, _) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;

        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(
            headers[header::LOCATION],
            format!("/platformresource?state_id={}", lti.id).as_str()
        );
        match app.states.get_state(&lti.id).unwrap() {
            Some(StoredState::Demo(demo)) => {
                assert_eq!(demo.platform_launch.unwrap().person_name, "Ada Lovelace");
            }
            other => panic!("Expected launched state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_type_shows_diagnostics() {
        let (_dir, app) = test_app();
        let lti = login(&app).await;
        let token = token_for(&lti, Some("gradebook"));

        let (status, headers, body) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
        assert!(body.contains("Technical breakdown of launch request"));
        match app.states.get_state(&lti.id).unwrap() {
            Some(StoredState::Demo(demo)) => {
                assert!(demo.platform_launch.is_none());
                assert!(demo.course_launch.is_none());
            }
            other => panic!("Expected launched state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_launch_state_is_single_use() {
        let (_dir, app) = test_app();
        let lti = login(&app).await;
        let token = token_for(&lti, Some("course"));

        let (status, _, _) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;
        assert_eq!(status, StatusCode::FOUND);

        let (status, _, body) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Wrong type of LtiState.");

        // The launched session survives the replay
        assert!(matches!(
            app.states.get_state(&lti.id).unwrap(),
            Some(StoredState::Demo(_))
        ));
    }

    #[tokio::test]
    async fn test_launch_with_unknown_state() {
        let (_dir, app) = test_app();
        let (status, _, body) =
            send(&app, post_form("/launch", launch_body("a.b.c", "nope"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "State missing. nope");
    }

    #[tokio::test]
    async fn test_launch_with_bad_nonce() {
        let (_dir, app) = test_app();
        let mut lti = login(&app).await;
        let id = lti.id.clone();
        lti.nonce = "forged".to_string();
        let token = token_for(&lti, Some("system"));

        let (status, _, body) = send(&app, post_form("/launch", launch_body(&token, &id))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("nonce"));
        assert!(app.states.get_state(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_launch_from_unregistered_deployment() {
        let (_dir, app) = test_app();
        let lti = login(&app).await;
        let mut payload = json!({
            "iss": ISSUER,
            "aud": CLIENT_ID,
            "nonce": lti.nonce,
            CLAIM_DEPLOYMENT_ID: "dep-999"
        });
        payload[CLAIM_CUSTOM] = json!({ TOOL_TYPE_CLAIM: "system" });
        let token = encode_token(&payload);

        let (status, _, body) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("dep-999"));
    }

    #[tokio::test]
    async fn test_launch_deployment_must_match_login() {
        let (_dir, app) = test_app();
        let lti = login_with(&app, &format!("{}&lti_deployment_id=dep-2", login_query())).await;
        assert_eq!(lti.deployment_id.as_deref(), Some("dep-2"));
        let token = token_for(&lti, Some("system"));

        let (status, _, body) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("dep-2"));
        assert!(app.states.get_state(&lti.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_launch_deployment_matching_login() {
        let (_dir, app) = test_app();
        let lti = login_with(&app, &format!("{}&lti_deployment_id=dep-1", login_query())).await;
        let token = token_for(&lti, Some("system"));

        let (status, _, _) =
            send(&app, post_form("/launch", launch_body(&token, &lti.id))).await;

        assert_eq!(status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_launch_requires_token() {
        let (_dir, app) = test_app();
        let (status, _, body) = send(&app, post_form("/launch", "state=x".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("id_token"));
    }
}
