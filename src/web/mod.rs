pub mod api;
pub mod pages;

use crate::auth::{extract_token, AuthService, JwtAuth};
use crate::config::Config;
use crate::events::EventStore;
use crate::suggestions::SuggestionRequestor;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Auth service for JWT operations
    pub auth_service: Arc<AuthService>,
    /// Storage for calendar events
    pub store: Arc<dyn EventStore>,
    /// Slot suggestion requestor
    pub requestor: SuggestionRequestor,
}

/// Authentication middleware for protected routes
async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let is_api = req.uri().path().starts_with("/api/");

    let claims = extract_token(&jar, req.headers())
        .and_then(|token| state.auth_service.validate_token(&token));

    match claims {
        Ok(claims) => {
            req.extensions_mut().insert(JwtAuth { claims });
            next.run(req).await
        }
        Err(err) if is_api => err.into_response(),
        Err(_) => Redirect::to("/login").into_response(),
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/calendar", get(pages::calendar_handler))
        .route("/logout", post(pages::logout_handler))
        .route(
            "/api/events",
            get(api::list_events_handler).post(api::create_event_handler),
        )
        .route(
            "/api/events/{id}",
            get(api::get_event_handler)
                .put(api::update_event_handler)
                .delete(api::delete_event_handler),
        )
        .route("/api/calendar", get(api::calendar_view_handler))
        .route("/api/suggestions", post(api::suggestions_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let assets = ServeDir::new(&state.config.assets_dir);

    Router::new()
        .route("/", get(pages::index_handler))
        .route(
            "/login",
            get(pages::login_form_handler).post(pages::login_handler),
        )
        .route("/health", get(pages::health_handler))
        .merge(protected)
        .nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
