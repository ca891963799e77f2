//! ClearFlow Checkout HTTP Server
//!
//! Axum-based shell around the checkout flow. Each visitor gets a flow keyed
//! by its session id; responses carry the flow snapshot plus the site's
//! current text direction.

mod handlers;
mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clearflow_checkout::CheckoutConfig;

use crate::handlers::{
    close_checkout, get_checkout, get_locale, go_back, health_check, list_countries, list_plans,
    open_checkout, select_method, submit, toggle_locale, update_field,
};
use crate::state::{AppState, spawn_idle_sweeper};

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & catalog
        .route("/health", get(health_check))
        .route("/api/plans", get(list_plans))
        .route("/api/countries", get(list_countries))
        // Locale
        .route("/api/locale", get(get_locale))
        .route("/api/locale/toggle", post(toggle_locale))
        // Checkout flow
        .route("/api/checkout", post(open_checkout))
        .route("/api/checkout/{id}", get(get_checkout).delete(close_checkout))
        .route("/api/checkout/{id}/method", post(select_method))
        .route("/api/checkout/{id}/back", post(go_back))
        .route("/api/checkout/{id}/fields", put(update_field))
        .route("/api/checkout/{id}/submit", post(submit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CheckoutConfig::from_env()?;
    let state = AppState::new(&config);

    tracing::info!(
        "✓ Payment gateway: {} ({} ms latency)",
        state.gateway.name(),
        config.processing_latency.as_millis()
    );
    tracing::info!("✓ Default locale: {}", config.default_locale.tag());
    tracing::info!("✓ Idle checkouts evicted after {} s", config.idle_ttl.as_secs());

    let _sweeper = spawn_idle_sweeper(
        state.flows.clone(),
        config.idle_ttl.min(std::time::Duration::from_secs(60)),
    );

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 ClearFlow checkout running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                     - Health check");
    tracing::info!("  GET    /api/plans?cycle=           - Pricing catalog");
    tracing::info!("  GET    /api/countries              - Country options");
    tracing::info!("  GET    /api/locale                 - Current locale");
    tracing::info!("  POST   /api/locale/toggle          - Switch EN/AR");
    tracing::info!("  POST   /api/checkout               - Open checkout");
    tracing::info!("  GET    /api/checkout/{{id}}          - Checkout snapshot");
    tracing::info!("  POST   /api/checkout/{{id}}/method   - Choose method, continue");
    tracing::info!("  POST   /api/checkout/{{id}}/back     - Back to methods");
    tracing::info!("  PUT    /api/checkout/{{id}}/fields   - Edit billing field");
    tracing::info!("  POST   /api/checkout/{{id}}/submit   - Submit payment");
    tracing::info!("  DELETE /api/checkout/{{id}}          - Close checkout");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
