use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use shoplens::api::{self, AppState};
use shoplens::application::dto::RadioFixtures;
use shoplens::application::services::{DatasetCleaner, RadioService, RecommendationService};
use shoplens::config::AppConfig;
use shoplens::infrastructure::ocr::TesseractBackend;
use shoplens::infrastructure::persistence::SqliteRadioRepository;
use shoplens::infrastructure::vision::{
    train_classifier, CentroidClassifier, FastEmbedImageEmbedder, ImageEmbedder,
};

#[derive(Parser)]
#[command(name = "shoplens")]
#[command(about = "Find catalog products from text, handwriting or photos")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "SHOPLENS_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "SHOPLENS_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "SHOPLENS_PORT")]
    port: Option<u16>,

    /// Raw transactions CSV
    #[arg(long, global = true, env = "SHOPLENS_DATASET")]
    dataset: Option<PathBuf>,

    #[arg(long, global = true, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    #[arg(long, global = true, env = "QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,

    #[arg(long, global = true, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<String>,

    #[arg(long, global = true, env = "SHOPLENS_RADIO_DB")]
    radio_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Clean the raw dataset and write the cleaned CSV
    CleanDataset,
    /// Train the product photo classifier from the image directory
    TrainClassifier,
    /// Create a radio API user and print its token
    CreateUser { username: String },
    /// Import categories, stations, events and blog posts from a JSON file
    ImportRadio { file: PathBuf },
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dataset) = &self.dataset {
            config.catalog.dataset_path = dataset.clone();
        }
        if let Some(url) = &self.qdrant_url {
            config.vector_db.url = Some(url.clone());
        }
        if let Some(api_key) = &self.qdrant_api_key {
            config.vector_db.api_key = Some(api_key.clone());
        }
        if let Some(cmd) = &self.tesseract_cmd {
            config.ocr.tesseract_cmd = cmd.clone();
        }
        if let Some(path) = &self.radio_db {
            config.radio.database_path = path.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::CleanDataset => clean_dataset(&config).await,
        Commands::TrainClassifier => {
            let report = train_classifier(
                &config.classifier.image_dir,
                &config.classifier.model_path,
                image_embedder(&config),
            )
            .await
            .context("Classifier training failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::CreateUser { username } => {
            let radio = open_radio(&config)?;
            let (user, token) = radio.create_user(&username).await?;
            println!("Created user '{}' (id {})", user.username, user.id);
            println!("Token: {}", token);
            Ok(())
        }
        Commands::ImportRadio { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let fixtures: RadioFixtures =
                serde_json::from_str(&content).context("Invalid fixture file")?;
            let summary = open_radio(&config)?.import_fixtures(&fixtures).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

fn image_embedder(config: &AppConfig) -> Arc<dyn ImageEmbedder> {
    Arc::new(FastEmbedImageEmbedder::new(
        config.classifier.embedding_model,
        config.classifier.model_cache_dir.clone(),
    ))
}

fn open_radio(config: &AppConfig) -> Result<RadioService> {
    let repository = SqliteRadioRepository::new_with_path(&config.radio.database_path)
        .with_context(|| {
            format!(
                "Failed to open radio database {}",
                config.radio.database_path.display()
            )
        })?;
    Ok(RadioService::new(Box::new(repository)))
}

async fn clean_dataset(config: &AppConfig) -> Result<()> {
    let raw_path = config.catalog.dataset_path.clone();
    let cleaned_path = config.catalog.cleaned_dataset_path.clone();

    let summary = tokio::task::spawn_blocking(move || {
        let dataset = DatasetCleaner::new().clean_file(&raw_path)?;
        dataset.save(&cleaned_path)?;
        Ok::<_, anyhow::Error>(dataset.summary())
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        dataset = %config.catalog.dataset_path.display(),
        "Starting shoplens"
    );

    let ocr = Arc::new(TesseractBackend::new(&config.ocr));
    let classifier = Arc::new(CentroidClassifier::new(
        config.classifier.model_path.clone(),
        image_embedder(&config),
    ));
    let recommendations = Arc::new(RecommendationService::new(
        config.catalog.clone(),
        config.vector_db.clone(),
        ocr,
        classifier,
    ));
    let radio = Arc::new(open_radio(&config)?);

    let startup = Arc::clone(&recommendations);
    tokio::spawn(async move {
        if let Err(e) = startup.initialize().await {
            warn!("Catalog not initialized at startup: {}", e);
        }
    });

    let state = AppState {
        recommendations,
        radio,
        server: config.server,
    };
    api::serve(state).await
}
