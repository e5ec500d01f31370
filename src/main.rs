use anyhow::Context;
use clarity_assistant::{
    api::{build_router, init_state},
    config::LoggingConfig,
    Config,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("loading configuration")?;
    init_tracing(&config.logging);

    let state = init_state(&config)
        .await
        .context("initializing service state")?;
    let app = build_router(state, config.server.max_body_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Clarity Assistant listening on {}", addr);
    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
