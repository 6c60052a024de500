use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use bookmatch_api::{
    config::Config,
    db::{self, BookCatalog, Cache, PgCatalog},
    routes::{create_router, AppState},
    services::{
        preferences::{OpenAiAnalyzer, PreferenceExtractor},
        recommendation::Recommender,
        retrieval::CandidateRetriever,
        vocabulary::VocabularyService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url)
        .await
        .context("connect to postgres")?;
    let redis_client = db::create_redis_client(&config.redis_url).context("open redis client")?;
    let (cache, _cache_writer) = Cache::new(redis_client);

    let catalog: Arc<dyn BookCatalog> = Arc::new(PgCatalog::new(pool));

    let analyzer = OpenAiAnalyzer::new(
        config.openai_api_key.clone(),
        config.openai_api_url.clone(),
        config.openai_model.clone(),
    )?;
    let vocabulary = VocabularyService::new(catalog.clone(), cache);
    let extractor = PreferenceExtractor::new(
        Arc::new(analyzer),
        vocabulary,
        config.fallback_genres.clone(),
    );
    let retriever = CandidateRetriever::new(
        catalog.clone(),
        Duration::from_secs(config.retrieval_timeout_secs),
    );
    let recommender = Arc::new(Recommender::new(extractor, retriever, config.page_size));

    let app = create_router(AppState {
        recommender,
        catalog,
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await.context("serve")?;

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
