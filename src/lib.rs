//! Knowledge Query
//!
//! Answers natural-language questions over a mixed knowledge corpus:
//! - Two-tier caching of full responses and query embeddings
//! - Concurrent fan-out over vector and keyword backends with score reconciliation
//! - LLM answer synthesis with primary/secondary provider fallback

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::search::{DetailLookup, SearchSource};
use infrastructure::{
    cache::QueryCaches,
    embedding::{HttpClient, OpenAiEmbeddingProvider},
    llm::LlmProviderFactory,
    search::{
        InMemoryDetailLookup, InMemoryKeywordSource, InMemoryVectorSource, KeywordScorer,
        PgDetailLookup, PgKeywordSource, PgVectorSource,
    },
    services::{EmbeddingService, QueryService, SearchEngine, SynthesisEngine, SynthesisTarget},
};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// Create the application state from configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    config.query.validate()?;

    let caches = QueryCaches::in_memory(config.cache.response(), config.cache.embedding());

    let embedding = create_embedding_service(config, &caches)?;
    let (sources, detail_lookup) = create_backends(config)?;

    let search = SearchEngine::new(sources)
        .with_policy(config.search.score_policy())
        .with_fanout_timeout(config.search.fanout_timeout());

    let synthesis = create_synthesis_engine(config)?;

    let query_service = QueryService::new(embedding, search, synthesis, caches.responses.clone())
        .with_limits(config.query);

    Ok(AppState::new(Arc::new(query_service), detail_lookup))
}

fn create_embedding_service(
    config: &AppConfig,
    caches: &QueryCaches,
) -> anyhow::Result<EmbeddingService> {
    let settings = &config.embedding;
    let client = HttpClient::with_timeout(Duration::from_millis(settings.request_timeout_ms))?;
    let api_key = settings.api_key();

    let provider = match settings.base_url.as_deref() {
        Some(url) => OpenAiEmbeddingProvider::with_base_url(client, api_key, url),
        None => OpenAiEmbeddingProvider::new(client, api_key),
    }
    .with_model(&settings.model);

    info!(model = %settings.model, dimensions = settings.dimensions, "Embedding provider configured");

    Ok(
        EmbeddingService::new(Arc::new(provider), caches.embeddings.clone())
            .with_dimensions(settings.dimensions),
    )
}

type Backends = (Vec<Arc<dyn SearchSource>>, Arc<dyn DetailLookup>);

fn create_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    let search = &config.search;
    let scorer = KeywordScorer::new(&search.keyword_default_term);

    let Some(url) = config.database.url.as_deref() else {
        warn!("No database configured, using empty in-memory backends");

        let sources: Vec<Arc<dyn SearchSource>> = vec![
            Arc::new(InMemoryVectorSource::new("vectors", search.vector_source_types.clone())),
            Arc::new(InMemoryKeywordSource::new("wiki").with_scorer(scorer)),
        ];

        return Ok((sources, Arc::new(InMemoryDetailLookup::new())));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_lazy(url)
        .map_err(|e| anyhow::anyhow!("Invalid database configuration: {}", e))?;

    info!(scope = %search.scope, "Using Postgres search backends");

    let sources: Vec<Arc<dyn SearchSource>> = vec![
        Arc::new(PgVectorSource::new(
            "vectors",
            pool.clone(),
            search.scope.clone(),
            search.vector_source_types.clone(),
        )),
        Arc::new(
            PgKeywordSource::new("wiki", pool.clone())
                .with_app_name(search.wiki_app_name.clone())
                .with_scorer(scorer),
        ),
    ];

    let details = PgDetailLookup::new(pool).with_vector_table(search.vector_table.clone());

    Ok((sources, Arc::new(details)))
}

fn create_synthesis_engine(config: &AppConfig) -> anyhow::Result<SynthesisEngine> {
    let settings = &config.synthesis;
    let engine_config = settings.engine_config();

    // The HTTP timeout only backstops the per-attempt deadline
    let request_timeout = engine_config.deadline + Duration::from_secs(1);

    let primary = LlmProviderFactory::create(&settings.primary, request_timeout)?;
    let mut engine = SynthesisEngine::new(SynthesisTarget::new(primary, settings.primary.model.clone()))
        .with_config(engine_config);

    if let Some(secondary) = &settings.secondary {
        let provider = LlmProviderFactory::create(secondary, request_timeout)?;
        engine = engine.with_secondary(SynthesisTarget::new(provider, secondary.model.clone()));
    }

    info!(
        primary = %settings.primary.model,
        secondary = settings.secondary.as_ref().map(|s| s.model.as_str()).unwrap_or("none"),
        "Synthesis providers configured"
    );

    Ok(engine)
}
