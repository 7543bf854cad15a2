//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::PgStore,
    config::{Config, StoreBackend},
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        create_post_handler, create_reply_handler, list_exercises_handler, list_posts_handler,
        require_auth,
        rest::ApiDoc,
        state::AppState,
        toggle_reaction_handler, ws_handler,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use haven_core::feed::CommunityFeed;
use haven_core::identity::LabelStyle;
use haven_core::memory::MemoryStore;
use haven_core::ports::{AuthStore, CommunityStore};
use haven_core::reactions::ReactionLedger;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
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

    // --- 2. Pick the Store Backend ---
    // Both backends implement the same ports; everything downstream is
    // identical. The self-contained variant keeps its feed in process, uses
    // the collision-resistant label format and schedules mentor replies.
    let community: Arc<dyn CommunityStore>;
    let auth: Arc<dyn AuthStore>;
    let label_style;
    let mentor_replies_enabled;
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .expect("checked during config load");
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let store = Arc::new(PgStore::new(db_pool));
            info!("Running database migrations...");
            store.run_migrations().await?;
            info!("Database migrations complete.");
            community = store.clone();
            auth = store;
            label_style = LabelStyle::Short;
            mentor_replies_enabled = false;
        }
        StoreBackend::Memory => {
            info!("Using the self-contained in-memory store.");
            let store = Arc::new(MemoryStore::new());
            community = store.clone();
            auth = store;
            label_style = LabelStyle::Suffixed;
            mentor_replies_enabled = true;
        }
    }

    // --- 3. Build the Shared AppState ---
    let shutdown = CancellationToken::new();
    let app_state = Arc::new(AppState {
        feed: CommunityFeed::new(community.clone(), label_style),
        ledger: ReactionLedger::new(community),
        auth,
        config: config.clone(),
        shutdown: shutdown.clone(),
        mentor_replies_enabled,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/breathing/exercises", get(list_exercises_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/posts", get(list_posts_handler).post(create_post_handler))
        .route("/posts/{post_id}/replies", post(create_reply_handler))
        .route(
            "/posts/{post_id}/reactions/{kind}",
            post(toggle_reaction_handler),
        )
        .route("/ws", get(ws_handler))
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
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested; cancelling pending deferred work.");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
