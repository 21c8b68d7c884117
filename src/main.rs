use anyhow::Result;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use topk_sift::utils::{format_bytes, format_duration, format_report, setup_logging};
use topk_sift::{ClientIp, KeyExtractor, TopKConfig, TopKProcessor, TopKReport, WhitespaceField};

#[derive(Parser)]
#[command(name = "topk-sift")]
#[command(about = "Topk Sift - find the most frequent keys in logs far larger than memory")]
#[command(version)]
struct Args {
    #[arg(help = "Log file to analyse, or - to read stdin")]
    input: PathBuf,

    #[arg(short = 'k', long = "top", help = "Number of keys to report")]
    top: Option<usize>,

    #[arg(short, long, help = "Number of temporary partitions")]
    partitions: Option<usize>,

    #[arg(short, long, help = "Threads used to reduce partitions")]
    threads: Option<usize>,

    #[arg(short, long, help = "Count the N-th whitespace-separated field instead of the client IP")]
    field: Option<usize>,

    #[arg(short, long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(if args.verbose { "verbose" } else { "normal" })?;

    let mut config = match &args.config {
        Some(path) => TopKConfig::from_file(path)?,
        None => TopKConfig::default(),
    };
    if let Some(top) = args.top {
        config.top_k = top;
    }
    if let Some(partitions) = args.partitions {
        config.partition_count = partitions;
    }
    if let Some(threads) = args.threads {
        config.processing_threads = threads;
    }
    if args.verbose {
        config.verbose = true;
    }

    let from_stdin = args.input.as_os_str() == "-";
    if !from_stdin && !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, abandoning run and removing partitions");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    let processor = TopKProcessor::new(config)?.with_shutdown_signal(shutdown_flag);

    info!("Analysing {}", if from_stdin { "stdin".to_string() } else { args.input.display().to_string() });

    let start_time = Instant::now();
    let input = args.input.clone();
    let field = args.field;
    let report = tokio::task::spawn_blocking(move || analyse(&processor, &input, field)).await??;
    let total_time = start_time.elapsed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", format_report(&report));

    info!("Records: {}", report.stats.total_records);
    info!("Distinct keys: {}", report.stats.distinct_keys);
    info!("Partitions used: {}", report.stats.partitions_used);
    info!("Spilled to disk: {}", format_bytes(report.stats.bytes_spilled));
    info!("Total time: {}", format_duration(total_time.as_secs_f64()));

    Ok(())
}

fn analyse(processor: &TopKProcessor, input: &Path, field: Option<usize>) -> Result<TopKReport> {
    let extractor: Box<dyn KeyExtractor> = match field {
        Some(index) => Box::new(WhitespaceField(index)),
        None => Box::new(ClientIp),
    };

    let report = if input.as_os_str() == "-" {
        processor.process_reader(io::stdin().lock(), &*extractor)?
    } else {
        let file = File::open(input)?;
        let reader = BufReader::with_capacity(processor.config().read_buffer_size_bytes(), file);
        processor.process_reader(reader, &*extractor)?
    };

    Ok(report)
}
