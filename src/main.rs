use jemallocator::Jemalloc;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
};

use http::{Method, header};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod mailer;

mod security {
    pub mod codes;
    pub mod jwt;
}

mod models {
    pub mod booth;
    pub mod pending_user;
    pub mod print_job;
    pub mod user;
}

mod repositories {
    pub mod booth;
    pub mod pending_user;
    pub mod print_job;
    pub mod user;
}

mod services {
    pub mod auth;
    pub mod booths;
    pub mod jobs;
    pub mod points;
}

mod handlers {
    pub mod admin;
    pub mod auth;
    pub mod booths;
    pub mod jobs;
    pub mod public;
}

mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

mod storage {
    pub mod backend;
    pub mod local;
    pub mod s3;
}

mod printing {
    pub mod dispatch;
}

mod validation {
    pub mod identity;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://localhost:5173".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .max_age(Duration::from_secs(86400));

    let protected_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(50)
            .burst_size(200)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let register_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_register,
        ))
        .with_state(state.clone());

    let login_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/booth-login", post(handlers::auth::booth_login))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_login,
        ))
        .with_state(state.clone());

    let open_auth_routes = Router::new()
        .route("/api/auth/verify", post(handlers::auth::verify))
        .route(
            "/api/auth/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        .with_state(state.clone());

    // The Print Hub kiosk surface: lookup-and-act keyed by student ID or
    // RFID tag, no session login at the booth.
    let kiosk_routes = Router::new()
        .route(
            "/api/print/public/jobs/student/{identifier}",
            get(handlers::public::lookup_by_identifier),
        )
        .route(
            "/api/print/public/jobs/{id}/complete",
            post(handlers::public::complete_job),
        )
        .route(
            "/api/print/public/jobs/{id}/print-now",
            post(handlers::public::print_now),
        )
        .route(
            "/api/print/public/view/{id}",
            get(handlers::public::view_job),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route("/api/print/upload", post(handlers::jobs::upload))
        .route("/api/print/jobs", get(handlers::jobs::list_jobs))
        .route("/api/print/jobs/{id}", get(handlers::jobs::get_job))
        .route(
            "/api/print/jobs/{id}/cancel",
            post(handlers::jobs::cancel_job),
        )
        .route(
            "/api/print/download/{id}",
            get(handlers::jobs::download_job),
        )
        .layer(tower_governor::GovernorLayer::new(
            protected_governor_conf.clone(),
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let booth_routes = Router::new()
        .route("/api/booth/profile", get(handlers::booths::profile))
        .route("/api/booth/paper", patch(handlers::booths::update_paper))
        .route_layer(from_fn(middleware_layer::auth::require_booth))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route("/api/admin/users/{id}", patch(handlers::admin::update_user))
        .route(
            "/api/admin/users/{id}",
            delete(handlers::admin::delete_user),
        )
        .route(
            "/api/admin/users/{id}/points",
            post(handlers::admin::add_points),
        )
        .route("/api/admin/booths", post(handlers::admin::create_booth))
        .route("/api/admin/booths", get(handlers::admin::list_booths))
        .route(
            "/api/admin/booths/{id}",
            patch(handlers::admin::update_booth),
        )
        .route(
            "/api/admin/booths/{id}",
            delete(handlers::admin::delete_booth),
        )
        .route_layer(from_fn(middleware_layer::auth::require_admin))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(open_auth_routes)
        .merge(kiosk_routes)
        .merge(protected_routes)
        .merge(booth_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(60 * 1024 * 1024))
        .layer(cors);

    let sweep_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("🧹 Running scheduled sweep of expired jobs...");
            match services::jobs::cleanup_expired_jobs(&sweep_state).await {
                Ok(reaped) => {
                    tracing::info!("✅ Sweep completed - {} expired jobs removed", reaped);
                }
                Err(e) => {
                    tracing::error!("❌ Sweep failed: {}", e);
                }
            }
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background sweep started (runs every hour)");
    tracing::info!("✅ All systems operational");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
