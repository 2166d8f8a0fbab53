use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use chrono::NaiveDateTime;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod companies;
pub mod documents;
pub mod health;
pub mod members;
pub mod notifications;
pub mod profile;
pub mod search;

pub(crate) fn to_iso(timestamp: NaiveDateTime) -> String {
    timestamp.and_utc().to_rfc3339()
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register_admin))
        .route("/register/open", get(auth::registration_open))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let companies_routes = Router::new()
        .route(
            "/",
            get(companies::list_companies).post(companies::create_company),
        )
        .route(
            "/:id",
            get(companies::get_company)
                .patch(companies::update_company)
                .delete(companies::delete_company),
        )
        .route("/:id/stats", get(companies::company_stats));

    let members_routes = Router::new()
        .route("/", get(members::list_members).post(members::create_member))
        .route(
            "/:id",
            get(members::get_member)
                .patch(members::update_member)
                .delete(members::delete_member),
        )
        .route("/:id/status", post(members::set_member_status));

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route(
            "/:id",
            get(documents::get_document)
                .patch(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/:id/download", get(documents::download_document));

    let notifications_routes = Router::new()
        .route(
            "/",
            get(notifications::list_notifications).delete(notifications::delete_all),
        )
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route(
            "/:id",
            delete(notifications::delete_notification),
        )
        .route("/:id/read", post(notifications::mark_read));

    let search_routes = Router::new()
        .route("/", post(search::run_search))
        .route("/options", get(search::filter_options))
        .route(
            "/saved",
            get(search::list_saved_searches).post(search::save_search),
        )
        .route(
            "/saved/:id",
            axum::routing::patch(search::update_saved_search).delete(search::delete_saved_search),
        )
        .route("/saved/:id/use", post(search::touch_saved_search));

    let profile_routes = Router::new()
        .route("/", get(profile::my_profile))
        .route("/documents", get(profile::my_documents));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/companies", companies_routes)
        .nest("/api/members", members_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/notifications", notifications_routes)
        .nest("/api/search", search_routes)
        .nest("/api/profile", profile_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 64))
}
