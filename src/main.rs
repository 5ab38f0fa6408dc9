use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use clipseek::config::Config;
use clipseek::pipeline::Pipeline;
use clipseek::store::FingerprintStore;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("clipseek")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Content-based video clip search via perceptual frame fingerprints")
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("FILE")
                .help("Fingerprint database file")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("ingest")
                .about("Fingerprint and store every video in the reference library")
                .arg(
                    Arg::new("library")
                        .short('l')
                        .long("library")
                        .value_name("DIR")
                        .help("Directory of reference videos (defaults to the configured one)"),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Search for a query video inside the stored references")
                .arg(
                    Arg::new("video")
                        .short('i')
                        .long("video")
                        .value_name("FILE")
                        .help("Query video file")
                        .required(true),
                )
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .value_name("BITS")
                        .help("Per-frame Hamming distance threshold"),
                )
                .arg(
                    Arg::new("ratio")
                        .long("ratio")
                        .value_name("FRACTION")
                        .help("Minimum fraction of matching query frames per window"),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP upload front end (requires the 'api' feature)")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .default_value("8080"),
                ),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let filter = if verbose {
        "clipseek=debug,info"
    } else {
        "clipseek=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(db) = matches.get_one::<String>("db") {
        config.store.db_path = PathBuf::from(db);
    }

    match matches.subcommand() {
        Some(("ingest", sub_matches)) => run_ingest(config, sub_matches).await,
        Some(("compare", sub_matches)) => run_compare(config, sub_matches).await,
        Some(("serve", sub_matches)) => run_serve(config, sub_matches).await,
        _ => {
            println!("Use `clipseek ingest`, `clipseek compare`, or `clipseek serve`.");
            Ok(())
        }
    }
}

async fn run_ingest(config: Config, matches: &ArgMatches) -> Result<()> {
    let library_dir = matches
        .get_one::<String>("library")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.library.reference_dir.clone());

    if !library_dir.exists() {
        return Err(anyhow::anyhow!(
            "Reference directory not found: {}",
            library_dir.display()
        ));
    }

    config.validate()?;
    info!("🚀 clipseek ingest starting...");
    info!("📁 Reference library: {}", library_dir.display());

    let store = Arc::new(FingerprintStore::open(&config.store.db_path)?);
    let pipeline = Pipeline::new(config, store);

    let start_time = std::time::Instant::now();
    let report = pipeline.ingest_directory(&library_dir).await?;
    let duration = start_time.elapsed();

    info!("🎉 Ingestion completed in {:.2}s", duration.as_secs_f64());
    info!("✅ Ingested: {}", report.ingested);
    info!("📋 Skipped (already stored): {}", report.skipped);
    info!("❌ Failed: {}", report.failed);

    Ok(())
}

async fn run_compare(mut config: Config, matches: &ArgMatches) -> Result<()> {
    let query_path = PathBuf::from(
        matches
            .get_one::<String>("video")
            .expect("--video is required"),
    );

    if let Some(threshold) = matches.get_one::<String>("threshold") {
        config.matching.distance_threshold = threshold.parse()?;
    }
    if let Some(ratio) = matches.get_one::<String>("ratio") {
        config.matching.min_match_ratio = ratio.parse()?;
    }

    config.validate()?;
    info!("🚀 clipseek compare starting...");
    info!("🎬 Query video: {}", query_path.display());

    let store = Arc::new(FingerprintStore::open(&config.store.db_path)?);
    let save_reports = config.output.save_reports;
    let pipeline = Pipeline::new(config, store);

    let start_time = std::time::Instant::now();
    let results = pipeline.compare(&query_path).await?;
    let duration = start_time.elapsed();

    info!("🎉 Comparison completed in {:.2}s", duration.as_secs_f64());

    if results.is_empty() {
        println!("No matches found.");
    } else {
        for result in &results {
            println!("{}", result.describe());
        }
    }

    if save_reports {
        pipeline.write_report(&query_path, &results).await?;
    }

    Ok(())
}

#[cfg(feature = "api")]
async fn run_serve(config: Config, matches: &ArgMatches) -> Result<()> {
    let port: u16 = matches
        .get_one::<String>("port")
        .map(|p| p.parse())
        .transpose()?
        .unwrap_or(8080);

    config.validate()?;

    let store = Arc::new(FingerprintStore::open(&config.store.db_path)?);
    let config = Arc::new(config);
    let pipeline = Arc::new(Pipeline::new((*config).clone(), Arc::clone(&store)));

    clipseek::api::start_http_server(pipeline, config, port).await
}

#[cfg(not(feature = "api"))]
async fn run_serve(_config: Config, _matches: &ArgMatches) -> Result<()> {
    Err(anyhow::anyhow!(
        "This build does not include the HTTP API; rebuild with --features api"
    ))
}
