//! pdf-rag command line
//!
//! Run with: cargo run -p pdf-rag -- chat

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_rag::chat::{ChatSession, ExitReason};
use pdf_rag::generation::AnswerGenerator;
use pdf_rag::ingestion::{IngestPipeline, IngestProgress, IngestReport};
use pdf_rag::providers::{
    self, EmbeddingProvider, GeminiClient, GeminiEmbedder, GeminiModels, HttpClient,
    VectorStoreProvider,
};
use pdf_rag::retrieval::Retriever;
use pdf_rag::RagConfig;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-rag",
    version,
    about = "Ask questions about a PDF using Gemini embeddings and a Pinecone index"
)]
struct Cli {
    /// Dotenv file to load before reading configuration (default: ./.env if present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, split, embed and store a PDF
    Ingest {
        /// PDF to ingest (overrides PDF_PATH)
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Answer questions interactively from the stored document
    Chat,
    /// Ingest and then chat in one process
    Run {
        /// PDF to ingest (overrides PDF_PATH)
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Print index statistics
    Stats,
    /// List models available to the Gemini API key
    Models,
}

/// Remote clients shared by the subcommands
struct Services {
    config: Arc<RagConfig>,
    http: HttpClient,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl Services {
    async fn connect(config: RagConfig) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(GeminiEmbedder::from_config(&config, http.clone())?);
        let store = providers::vector_store_from_config(&config, http.clone()).await?;

        tracing::info!("Configuration loaded");
        tracing::info!("  - Embedding model: {}", embedder.model());
        tracing::info!("  - Embedding dimensions: {}", embedder.dimensions());
        tracing::info!("  - Vector store: {}", store.name());
        tracing::info!("  - Namespace: {}", config.vector_db.namespace);

        Ok(Self {
            config: Arc::new(config),
            http,
            embedder,
            store,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load before tracing so RUST_LOG can come from the file
    let env_loaded = load_env_file(cli.env_file.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match env_loaded {
        Ok(()) => execute(cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(ExitReason::UserExit) | Ok(ExitReason::EndOfInput) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            // A missing .env is normal
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

/// Run one subcommand; non-interactive commands report `EndOfInput`
async fn execute(command: Command) -> Result<ExitReason> {
    let mut config = RagConfig::from_env().context("Invalid configuration")?;

    match command {
        Command::Ingest { pdf } => {
            if let Some(pdf) = pdf {
                config.ingestion.pdf_path = pdf;
            }
            let services = Services::connect(config).await?;
            ingest(&services).await?;
            Ok(ExitReason::EndOfInput)
        }
        Command::Chat => {
            let services = Services::connect(config).await?;
            print_stats(&services).await;
            chat(&services).await
        }
        Command::Run { pdf } => {
            if let Some(pdf) = pdf {
                config.ingestion.pdf_path = pdf;
            }
            let services = Services::connect(config).await?;
            ingest(&services).await?;
            print_stats(&services).await;
            chat(&services).await
        }
        Command::Stats => {
            let http = HttpClient::new(&config.http)?;
            let store = providers::vector_store_from_config(&config, http).await?;
            let stats = store
                .describe_stats(None)
                .await
                .context("Failed to read index statistics")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(ExitReason::EndOfInput)
        }
        Command::Models => {
            let http = HttpClient::new(&config.http)?;
            let models = GeminiModels::from_config(&config, http)?.list().await?;
            println!("Available models:");
            for model in models {
                if model.supports_embedding() {
                    println!("{} (embedding)", model.name);
                } else {
                    println!("{}", model.name);
                }
            }
            Ok(ExitReason::EndOfInput)
        }
    }
}

async fn ingest(services: &Services) -> Result<IngestReport> {
    let path = services.config.ingestion.pdf_path.clone();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} batches, {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let progress_bar = bar.clone();

    let pipeline = IngestPipeline::new(
        &services.config,
        services.embedder.clone(),
        services.store.clone(),
    )?
    .with_progress(Arc::new(move |progress: IngestProgress| {
        progress_bar.set_length(progress.batches_total as u64);
        progress_bar.set_position(progress.batches_done as u64);
        progress_bar.set_message(format!("{} records", progress.records_done));
    }));

    let result = pipeline.run(&path).await;
    bar.finish_and_clear();

    let report = result.with_context(|| format!("Failed to ingest {}", path.display()))?;
    println!(
        "Ingested {}: {} pages, {} chunks ({} blank skipped), {} records in {} batches",
        path.display(),
        report.documents,
        report.chunks,
        report.skipped_blank,
        report.records_upserted,
        report.batches
    );
    println!(
        "Documents stored in namespace '{}'",
        services.config.vector_db.namespace
    );

    Ok(report)
}

/// Print index statistics; failures only warn
async fn print_stats(services: &Services) {
    match services.store.describe_stats(None).await {
        Ok(stats) => {
            println!("\nIndex Stats:");
            match serde_json::to_string_pretty(&stats) {
                Ok(json) => println!("{}\n", json),
                Err(e) => tracing::warn!("Failed to format index stats: {}", e),
            }

            let expected = services.embedder.dimensions();
            if let Some(dimension) = stats.dimension.filter(|d| *d != expected) {
                tracing::warn!(
                    "Index dimension {} does not match embedding dimension {} ({})",
                    dimension,
                    expected,
                    services.embedder.model()
                );
            }
        }
        Err(e) => tracing::warn!("Could not read index stats: {}", e),
    }
}

async fn chat(services: &Services) -> Result<ExitReason> {
    let llm = Arc::new(GeminiClient::from_config(&services.config, services.http.clone())?);
    tracing::info!("Chat model: {}", services.config.llm.model);

    let session = ChatSession::new(
        Retriever::new(
            &services.config,
            services.embedder.clone(),
            services.store.clone(),
        ),
        AnswerGenerator::new(llm),
    );

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    let reason = session.run(input, &mut output).await?;
    output.flush()?;

    Ok(reason)
}
