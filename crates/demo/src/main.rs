mod app;
mod people;
mod users;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crudkit_observability::init();

    let addr = std::env::var("CRUDKIT_DEMO_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    // The worker thread lives as long as the people service does.
    let app::App { router, person_worker: _person_worker } = app::build_app();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
