//! HTML page rendering.
//!
//! Pages are assembled by hand; every interpolated value goes through
//! [`html_escape`].

use crate::db::Resource;
use crate::lti::{LtiClaims, RoleSet, claims::display_value};
use crate::state::{CourseLaunchState, LaunchState};

/// Content type of every page the tool renders
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// Base HTML template wrapper.
fn html_page(title: &str, style: Option<&str>, body: &str) -> String {
    let mut html = String::with_capacity(body.len() + 256);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>");
    html.push_str(&html_escape(title));
    html.push_str("</title>\n");
    if let Some(style) = style {
        html.push_str("<style>\n");
        html.push_str(style);
        html.push_str("\n</style>\n");
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(body);
    html.push_str("</body>\n</html>\n");
    html
}

fn push_roles(body: &mut String, roles: &RoleSet) {
    body.push_str("<p>Your roles for this resource</p><ul>\n");
    for role in roles.iter() {
        body.push_str(&format!("<li><strong>{}</strong></li>\n", html_escape(role)));
    }
    body.push_str("</ul>\n");
}

fn push_identity(body: &mut String, launch: &LaunchState) {
    body.push_str(&format!(
        "<p>According to <strong>{}</strong> you are <strong>{}</strong></p>\n",
        html_escape(&launch.platform_name),
        html_escape(&launch.person_name)
    ));
}

/// Page shown for launches whose tool type was not recognised
pub fn render_launch_diagnostics(base_path: &str, claims: &LtiClaims) -> String {
    let platform = claims.tool_platform();
    let context = claims.context();
    let item = |label: &str, value: Option<&str>| {
        format!(
            "<li>{}<br/>{}</li>\n",
            label,
            html_escape(value.unwrap_or("null"))
        )
    };

    let mut body = String::new();
    body.push_str(&format!(
        "<h1>LTI launch at {}</h1>\n",
        html_escape(if base_path.is_empty() { "/" } else { base_path })
    ));
    body.push_str(
        "<p>The LTI Launch was not configured properly. \
         The following may help understand what happened.</p>\n",
    );

    body.push_str("<h2>About the Launch Request</h2>\n<ul>\n");
    body.push_str(&item("Tool platform guid", platform.guid.as_deref()));
    body.push_str(&item("Tool platform url", platform.url.as_deref()));
    body.push_str(&item("Context label", context.label.as_deref()));
    body.push_str(&item("Context title", context.title.as_deref()));
    if let Some(context_type) = context.first_type() {
        body.push_str(&item("Context type", Some(context_type)));
    }
    body.push_str("</ul>\n");

    body.push_str("<h2>Technical breakdown of launch request</h2>\n<pre>\n");
    for key in claims.sorted_keys() {
        let value = claims.get(key).map(display_value).unwrap_or_default();
        body.push_str(&html_escape(key));
        body.push_str(" = ");
        body.push_str(&html_escape(&value));
        body.push_str("\n\n");
    }
    body.push_str("</pre>\n");

    html_page(
        "LTI Launch Diagnostics",
        Some("li { padding: 1em 1em 1em 1em; }"),
        &body,
    )
}

/// Page of the platform-wide tool
pub fn render_platform_resource(server_name: &str, launch: &LaunchState) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "<h1>A Platform Level Tool On {}</h1>\n",
        html_escape(server_name)
    ));
    body.push_str("<h2>About the Resource</h2>\n");
    push_identity(&mut body, launch);
    push_roles(&mut body, &launch.roles);
    body.push_str("<h2>The Resource</h2>\n");
    body.push_str("<p>This resource is currently empty and cannot be edited yet.</p>\n");

    html_page("Platform Resource", None, &body)
}

/// Page of the course content tool
pub fn render_course_resource(
    server_name: &str,
    base_path: &str,
    state_id: &str,
    course: &CourseLaunchState,
) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "<h1>A Course Content Tool On {}</h1>\n",
        html_escape(server_name)
    ));
    body.push_str("<h2>About the Resource</h2>\n");
    push_identity(&mut body, &course.launch);
    body.push_str(&format!(
        "<p>Course <strong>{}</strong> ({}), resource <strong>{}</strong></p>\n",
        html_escape(&course.course_title),
        html_escape(&course.course_id),
        html_escape(&course.resource_id)
    ));
    push_roles(&mut body, &course.launch.roles);

    body.push_str("<h2>The Resource</h2>\n");
    match &course.resource {
        Some(resource) => push_resource(&mut body, base_path, state_id, resource, course),
        None => body.push_str("<p>No resource is bound to this link.</p>\n"),
    }

    html_page("Course Resource", None, &body)
}

fn push_resource(
    body: &mut String,
    base_path: &str,
    state_id: &str,
    resource: &Resource,
    course: &CourseLaunchState,
) {
    if resource.is_empty() {
        body.push_str("<p>This resource is currently empty.</p>\n");
    } else {
        body.push_str(&format!(
            "<pre>{}</pre>\n",
            html_escape(resource.content.as_deref().unwrap_or_default())
        ));
    }

    let action = format!("{}/courseresource/update", base_path);
    let hidden_state = format!(
        "<input type=\"hidden\" name=\"state_id\" value=\"{}\"/>\n",
        html_escape(state_id)
    );

    body.push_str(&format!(
        "<form method=\"post\" action=\"{}\">\n",
        html_escape(&action)
    ));
    body.push_str(&hidden_state);
    body.push_str("<input type=\"hidden\" name=\"action\" value=\"save\"/>\n");
    body.push_str(&format!(
        "<textarea name=\"content\">{}</textarea>\n",
        html_escape(resource.content.as_deref().unwrap_or_default())
    ));
    body.push_str("<button type=\"submit\">Save</button>\n</form>\n");

    if course.allowed_to_clear_resource {
        body.push_str(&format!(
            "<form method=\"post\" action=\"{}\">\n",
            html_escape(&action)
        ));
        body.push_str(&hidden_state);
        body.push_str("<input type=\"hidden\" name=\"action\" value=\"clear\"/>\n");
        body.push_str("<button type=\"submit\">Clear the resource</button>\n</form>\n");
    }
}

/// Escape text for inclusion in HTML content or attribute values
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
