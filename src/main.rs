//! App Clusters - Main Entry Point
//!
//! Tags the applications on a launcher's home screen with a language model and
//! prints them grouped by similarity.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app_clusters::clients::build_clients;
use app_clusters::config::{Config, Provider};
use app_clusters::error::EmptyInput;
use app_clusters::services::{
    extract_apps, seed_demo_database, Dbscan, Embedder, Orchestrator, TagCache, TagClassifier,
};
use app_clusters::Error;

/// Group launcher applications by what they do.
#[derive(Parser, Debug)]
#[command(name = "app-clusters")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag, embed and cluster every application in the launcher database
    Run(RunArgs),

    /// List the applications found in the launcher database as `package,name`
    Extract {
        /// Launcher database (defaults to LAUNCHER_DB_PATH)
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Create a small demo launcher database
    SeedDemo {
        /// Where to create it (defaults to LAUNCHER_DB_PATH)
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Launcher database (defaults to LAUNCHER_DB_PATH)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Tag cache file (defaults to TAG_CACHE_PATH)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Remote model provider (defaults to LLM_PROVIDER)
    #[arg(long, value_enum)]
    provider: Option<Provider>,

    /// Neighbourhood radius in cosine distance (defaults to CLUSTER_EPS)
    #[arg(long)]
    eps: Option<f32>,

    /// Neighbours needed for a core point, itself included (defaults to CLUSTER_MIN_POINTS)
    #[arg(long)]
    min_points: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "app_clusters=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let outcome = match cli.command {
        Commands::Run(args) => run(apply_overrides(config, args)).await,
        Commands::Extract { database } => extract(database.unwrap_or(config.database_path)),
        Commands::SeedDemo { path } => seed(path.unwrap_or(config.database_path)),
    };

    if let Err(e) = &outcome {
        match e {
            Error::EmptyInput(reason) => info!("Stopping: {}", reason),
            other => error!("❌ {}", other),
        }
    }
    outcome.map_err(Into::into)
}

fn apply_overrides(mut config: Config, args: RunArgs) -> Config {
    if let Some(provider) = args.provider {
        config = config.with_provider(provider, |key| std::env::var(key).ok());
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(cache) = args.cache {
        config.cache_path = cache;
    }
    if let Some(eps) = args.eps {
        config.cluster.eps = eps;
    }
    if let Some(min_points) = args.min_points {
        config.cluster.min_points = min_points;
    }
    config
}

async fn run(config: Config) -> app_clusters::Result<()> {
    config.validate()?;
    info!("🚀 Starting app-clusters v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "📦 Provider: {} (classifier {}, embeddings {})",
        config.provider, config.classifier_model, config.embedding_model
    );

    let apps = extract_apps(&config.database_path)?;
    if apps.is_empty() {
        return Err(Error::EmptyInput(EmptyInput::NoApplications));
    }

    let (generator, embedding_client) = build_clients(&config)?;
    let clusterer = Dbscan::new(config.cluster)?;
    info!(
        "🔧 DBSCAN eps={} min_points={} (cosine)",
        config.cluster.eps, config.cluster.min_points
    );

    let cache = TagCache::load(&config.cache_path);
    info!("Tag cache {}: {} entries", cache.path().display(), cache.len());

    let classifier = TagClassifier::new(generator).with_model(&config.classifier_model);
    let embedder = Embedder::new(embedding_client)
        .with_model(&config.embedding_model)
        .with_expected_dimension(config.embedding_dimension);

    let mut orchestrator = Orchestrator::new(classifier, embedder, Box::new(clusterer), cache);
    let output = orchestrator.run(apps).await?;

    let rendered = serde_json::to_string_pretty(&output.groups)
        .map_err(|e| Error::Configuration(format!("failed to render result: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn extract(database: PathBuf) -> app_clusters::Result<()> {
    for app in extract_apps(&database)? {
        println!("{},{}", app.package, app.name);
    }
    Ok(())
}

fn seed(path: PathBuf) -> app_clusters::Result<()> {
    if seed_demo_database(&path)? {
        info!("✅ Demo database written to {}", path.display());
    }
    Ok(())
}
