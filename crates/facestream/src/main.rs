use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facestream_analysis::{FaceAnalyzer, RekognitionAnalyzer};
use facestream_bucket::{BucketStore, NoopBucketStore, S3BucketStore};
use facestream_processing::{FrameIngestHandler, HandlerConfig, StreamBatch};
use facestream_repository::{
    FrameRecordRepository, LoggingRepository, PostgresRepository, DEFAULT_TABLE,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Facestream frame ingest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one stream event (a batch of frame records)
    Process(ProcessArgs),
    /// Run database migrations
    Migrate,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Path to the event JSON, or `-` for stdin
    #[arg(long, default_value = "-")]
    event: PathBuf,
    /// Optional TOML config file; environment variables take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// Analyze frames but log records instead of writing images and rows
    #[arg(long)]
    dry_run: bool,
    /// Connection pool size for the record store
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Process(args) => process(args).await,
        Command::Migrate => {
            let database_url =
                std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
            let repository = PostgresRepository::connect(&database_url, 1, DEFAULT_TABLE).await?;
            repository.run_migrations().await?;
            info!(table = DEFAULT_TABLE, "Database migrations applied");
            Ok(())
        }
    }
}

async fn process(args: ProcessArgs) -> Result<()> {
    let config = HandlerConfig::load(args.config.as_deref()).context("invalid configuration")?;
    let raw = read_event(&args.event)?;
    let batch = StreamBatch::from_json(&raw).context("failed to parse stream event")?;
    info!(records = batch.len(), dry_run = args.dry_run, "stream event received");

    let analyzer: Arc<dyn FaceAnalyzer> =
        Arc::new(RekognitionAnalyzer::new(config.rekognition.clone()).await?);

    let (bucket, records) = if args.dry_run {
        dry_run_sinks(&config)
    } else {
        live_sinks(&config, args.max_connections).await?
    };

    let handler = FrameIngestHandler::new(analyzer, bucket, records, config.settings);
    let summary = handler.process_batch(&batch).await?;

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

type Sinks = (Arc<dyn BucketStore>, Arc<dyn FrameRecordRepository>);

fn dry_run_sinks(config: &HandlerConfig) -> Sinks {
    let bucket: Arc<dyn BucketStore> = Arc::new(NoopBucketStore::new(config.s3.bucket.clone()));
    let records: Arc<dyn FrameRecordRepository> = Arc::new(LoggingRepository);
    (bucket, records)
}

async fn live_sinks(config: &HandlerConfig, max_connections: u32) -> Result<Sinks> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set unless --dry-run is given")?;
    let repository = PostgresRepository::connect(database_url, max_connections, &config.table)
        .await
        .context("failed to connect to the record store")?;
    if repository.table() != DEFAULT_TABLE {
        warn!(
            table = %repository.table(),
            "custom table is not created by migrations; it must already exist"
        );
    }

    let bucket: Arc<dyn BucketStore> = Arc::new(S3BucketStore::new(config.s3.clone()).await?);
    let records: Arc<dyn FrameRecordRepository> = Arc::new(repository);
    Ok((bucket, records))
}

fn read_event(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read event from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event file {}", path.display()))
}
