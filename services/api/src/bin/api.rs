//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::Config,
    error::ApiError,
    web::{
        admin::{
            create_course_handler, create_training_handler, delete_course_handler,
            delete_training_handler, update_course_handler, update_training_handler,
        },
        auth::{login_handler, logout_handler, session_handler, signup_handler},
        complete_lesson_handler, course_progress_handler, list_completed_lessons_handler,
        list_courses_handler, list_trainings_handler,
        middleware::{require_admin, require_auth},
        rest::ApiDoc,
        state::AppState,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    // The one adapter implements both collaborator ports.
    let app_state = Arc::new(AppState {
        gateway: db_adapter.clone(),
        catalog: db_adapter,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Session-protected routes (role check replayed on every request). The
    // admin console mutations additionally carry the admin check, applied
    // per method so it runs after `require_auth` has attached the user.
    let admin = || axum_middleware::from_fn(require_admin);
    let protected_routes = Router::new()
        .route("/auth/session", get(session_handler))
        .route("/courses", get(list_courses_handler))
        .route("/courses", post(create_course_handler).layer(admin()))
        .route(
            "/courses/{id}",
            put(update_course_handler)
                .delete(delete_course_handler)
                .layer(admin()),
        )
        .route("/courses/{id}/progress", get(course_progress_handler))
        .route("/trainings", get(list_trainings_handler))
        .route("/trainings", post(create_training_handler).layer(admin()))
        .route(
            "/trainings/{id}",
            put(update_training_handler)
                .delete(delete_training_handler)
                .layer(admin()),
        )
        .route(
            "/completed-lessons",
            get(list_completed_lessons_handler).post(complete_lesson_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
