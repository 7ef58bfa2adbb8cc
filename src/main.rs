use std::net::SocketAddr;
use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{response::Html, routing::get, Extension, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use catalog_ingestion::cli::{Cli, Command};
use catalog_ingestion::clients::{AssetFetcher, HttpAssetFetcher};
use catalog_ingestion::config::Config;
use catalog_ingestion::handlers::RecordLoader;
use catalog_ingestion::models::BatchConfig;
use catalog_ingestion::processing::{AssetPipeline, AssetStore, MemoryAssetStore, S3AssetStore};
use catalog_ingestion::schema::{build_schema, IngestionSchema};
use catalog_ingestion::storage::{self, CatalogStore, InMemoryCatalogStore, MongoCatalogStore, TaxonomySeed};
use catalog_ingestion::sync::{IngestionPipeline, PipelineSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env();
    tracing::info!(database = %cfg.database_name, bucket = %cfg.default_image_bucket, "Loaded configuration");

    match cli.command() {
        Command::Serve => serve(cfg).await,
        Command::Migrate => {
            let db = storage::connect(&cfg).await?;
            storage::ensure_indexes(&db).await?;
            tracing::info!("Indexes are up to date");
            Ok(())
        }
        Command::Import { source, category, subcategory, category_id, subcategory_id, on_duplicate, dry_run } => {
            let fetcher: Arc<dyn AssetFetcher> = Arc::new(HttpAssetFetcher::from_config(&cfg)?);
            let payload = RecordLoader::new(fetcher.clone()).load(source).await?;

            let mut batch: BatchConfig = payload.config.unwrap_or_default();
            if category.is_some() { batch.category = category.clone(); }
            if subcategory.is_some() { batch.subcategory = subcategory.clone(); }
            if category_id.is_some() { batch.category_id = category_id.clone(); }
            if subcategory_id.is_some() { batch.subcategory_id = subcategory_id.clone(); }
            if on_duplicate.is_some() { batch.on_duplicate = *on_duplicate; }

            let (store, assets): (Arc<dyn CatalogStore>, Arc<dyn AssetStore>) = if *dry_run {
                let seed = |id: &Option<String>, label: &Option<String>, default: &str| TaxonomySeed {
                    id: id.clone(),
                    label: label.clone().unwrap_or_else(|| default.to_string()),
                };
                let catalog = InMemoryCatalogStore::with_taxonomy(
                    &seed(&batch.category_id, &batch.category, &cfg.default_category_label),
                    &seed(&batch.subcategory_id, &batch.subcategory, &cfg.default_subcategory_label),
                )?;
                (Arc::new(catalog), Arc::new(MemoryAssetStore::new("memory://assets")))
            } else {
                let db = storage::connect(&cfg).await?;
                if cfg.auto_migrate {
                    storage::ensure_indexes(&db).await?;
                }
                (Arc::new(MongoCatalogStore::with_db(db)), Arc::new(S3AssetStore::new(&cfg).await?))
            };

            let pipeline = IngestionPipeline::new(
                store,
                AssetPipeline::new(fetcher, assets, cfg.max_image_bytes()),
                PipelineSettings::from_config(&cfg),
            );
            let report = pipeline.run(&payload.items, &batch).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(err) = report.setup_error {
                anyhow::bail!("batch aborted: {}", err);
            }
            Ok(())
        }
    }
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let db = storage::connect(&cfg).await?;
    if cfg.auto_migrate {
        tracing::info!("Creating indexes on startup...");
        if let Err(e) = storage::ensure_indexes(&db).await {
            tracing::warn!(error = %e, "Failed to create indexes on startup");
        }
    }

    let store: Arc<dyn CatalogStore> = Arc::new(MongoCatalogStore::with_db(db));
    let fetcher: Arc<dyn AssetFetcher> = Arc::new(HttpAssetFetcher::from_config(&cfg)?);
    let assets: Arc<dyn AssetStore> = Arc::new(S3AssetStore::new(&cfg).await?);
    let pipeline = Arc::new(IngestionPipeline::new(
        store,
        AssetPipeline::new(fetcher, assets, cfg.max_image_bytes()),
        PipelineSettings::from_config(&cfg),
    ));

    let schema = build_schema(pipeline);
    let app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .layer(Extension(schema))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.port).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(port = cfg.port, "Port is already in use. Set PORT or stop the other process.");
            }
            return Err(e.into());
        }
    };
    tracing::info!(port = cfg.port, "Catalog ingestion service listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn graphql_playground() -> Html<String> {
    Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
    ))
}

async fn graphql_handler(Extension(schema): Extension<IngestionSchema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn health_check() -> &'static str {
    "OK"
}
