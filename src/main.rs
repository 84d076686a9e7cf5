use quill_api::config;
use quill_api::identity::IdentityProvider;
use quill_api::routes::app;
use quill_api::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, IDENTITY_URL, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_api=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting Quill API in {:?} mode", config.environment);

    let identity = match IdentityProvider::from_env() {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("identity provider configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Schema changes need the privileged connection; skip when it isn't
    // configured (e.g. running against an externally managed database)
    if std::env::var("SERVICE_DATABASE_URL").is_ok() {
        if let Err(e) = quill_api::database::PoolManager::run_migrations().await {
            tracing::error!("migration failure: {}", e);
            std::process::exit(1);
        }
    }

    let app = app(AppState::new(identity));

    // Allow tests or deployments to override port via env
    let port = std::env::var("QUILL_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Quill API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
