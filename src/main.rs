use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use checkout_gateway::config::AppConfig;
use checkout_gateway::gateways::razorpay::RazorpayGateway;
use checkout_gateway::http::middleware::auth::AuthState;
use checkout_gateway::repo::orders_repo::OrdersRepo;
use checkout_gateway::service::order_service::OrderFinalizer;
use checkout_gateway::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let orders: Arc<dyn checkout_gateway::repo::orders_repo::OrderStore> =
        Arc::new(OrdersRepo { pool });

    let gateway = Arc::new(RazorpayGateway {
        base_url: cfg.razorpay_base_url.clone(),
        key_id: cfg.razorpay_key_id.clone(),
        key_secret: cfg.razorpay_key_secret.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
        client: reqwest::Client::new(),
    });

    let order_service = Arc::new(OrderFinalizer {
        orders: orders.clone(),
        gateway,
        key_secret: cfg.razorpay_key_secret.clone(),
    });

    let state = AppState {
        order_service,
        orders,
    };

    let auth = AuthState {
        token_secret: cfg.auth_token_secret.clone(),
    };

    let authed_routes = Router::new()
        .route(
            "/payments/create-order",
            post(checkout_gateway::http::handlers::payments::create_gateway_order),
        )
        .route(
            "/payments/verify",
            post(checkout_gateway::http::handlers::payments::verify_payment),
        )
        .route("/orders", get(checkout_gateway::http::handlers::orders::list_my_orders))
        .route(
            "/orders/:order_id",
            get(checkout_gateway::http::handlers::orders::get_order),
        )
        .layer(from_fn_with_state(
            auth,
            checkout_gateway::http::middleware::auth::require_bearer_token,
        ));

    let app = Router::new()
        .route("/health", get(checkout_gateway::http::handlers::payments::health))
        .merge(authed_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
