use axum::{
    extract::{Extension, Form, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use rust_i18n::t;
use std::collections::HashMap;
use tracing::{error, info, warn};

use super::AppState;
use crate::auth::{extract_token, removal_cookie, AuthError, Credentials, JwtAuth};

/// Handler for the landing page, signed-in users go straight to the calendar
pub async fn index_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let signed_in = extract_token(&jar, &headers)
        .and_then(|token| state.auth_service.validate_token(&token))
        .is_ok();

    if signed_in {
        Redirect::to("/calendar").into_response()
    } else {
        Html(include_str!("../../assets/index.html")).into_response()
    }
}

/// Error messages the login page is willing to display
fn allowed_error_messages() -> [String; 2] {
    [
        t!("login_invalid_credentials").to_string(),
        t!("login_error").to_string(),
    ]
}

/// Handler for the login form page
pub async fn login_form_handler(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let html = include_str!("../../assets/login.html");

    let html = match params.get("error") {
        // Only display errors we produced ourselves
        Some(message) if allowed_error_messages().contains(message) => html.replace(
            "<!-- ERROR_MESSAGE -->",
            &format!("<div class=\"alert alert-error\">{}</div>", message),
        ),
        _ => html.to_string(),
    };

    Html(html)
}

/// Handler for login form submission
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Response {
    match state
        .auth_service
        .authenticate(&credentials.username, &credentials.password)
    {
        Ok(token) => {
            info!("User {} successfully authenticated", credentials.username);
            let jar = jar.add(state.auth_service.session_cookie(token));
            (jar, Redirect::to("/calendar")).into_response()
        }
        Err(err) => {
            let message = match err {
                AuthError::Unauthorized => {
                    warn!("Failed login attempt for user: {}", credentials.username);
                    t!("login_invalid_credentials")
                }
                other => {
                    error!("Authentication error: {:?}", other);
                    t!("login_error")
                }
            };
            let location = format!("/login?error={}", urlencoding::encode(&message));
            (jar.remove(removal_cookie()), Redirect::to(&location)).into_response()
        }
    }
}

/// Handler for signing out
pub async fn logout_handler(jar: CookieJar, Extension(auth): Extension<JwtAuth>) -> Response {
    info!("User {} signed out", auth.user_id());
    (jar.remove(removal_cookie()), Redirect::to("/login")).into_response()
}

/// Handler for the calendar page
pub async fn calendar_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
) -> Html<String> {
    let settings = &state.config.calendar;
    let display_name = auth
        .claims
        .name
        .clone()
        .unwrap_or_else(|| auth.user_id().to_string());

    let week_start = settings.week_starts_on.num_days_from_sunday().to_string();
    let html = include_str!("../../assets/calendar.html")
        .replace("{{USERNAME}}", &escape_html(&display_name))
        .replace("{{DEFAULT_VIEW}}", settings.default_view.as_str())
        .replace("{{WEEK_START}}", &week_start)
        .replace("{{TIMEZONE}}", state.config.timezone.name());

    Html(html)
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Handler for API health check
pub async fn health_handler() -> &'static str {
    "OK"
}
