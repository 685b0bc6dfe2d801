use anyhow::Context;
use sponsor_ledger::orchestration::{Ingestor, Orchestrator};
use sponsor_ledger::{api, init_db, Config, DataSource, GitHubDataSource, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to open event cache at {}", config.database_path))?;

    let repo = Arc::new(Repository::new(pool));
    let datasource: Arc<dyn DataSource> = Arc::new(
        GitHubDataSource::new(config.github_api_url.clone(), config.github_token.clone())
            .with_page_size(config.page_size),
    );
    let ingestor = Ingestor::new(datasource.clone(), repo.clone(), config.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        ingestor,
        repo.clone(),
        datasource,
        config.short_month_policy,
    ));

    let app = api::create_router(api::AppState::new(repo, config, orchestrator));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
