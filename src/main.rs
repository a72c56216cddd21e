use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use logoclust::acquisition;
use logoclust::core::{
    ClusterPartitioner, ClusterReport, CorpusScanner, SIMILARITY_THRESHOLD, SignatureExtractor,
};

#[derive(Parser, Debug)]
#[command(name = "logoclust", version, about = "Cluster brand images into duplicate groups")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster a folder of images and write the partition reports
    Cluster {
        /// Directory of images to cluster
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,

        /// Fuzzy-grouping similarity threshold
        #[arg(long, default_value_t = SIMILARITY_THRESHOLD)]
        threshold: f64,

        /// Machine-readable partition output
        #[arg(long, value_name = "FILE", default_value = "logo_groups.json")]
        json_out: PathBuf,

        /// Human-readable summary output
        #[arg(long, value_name = "FILE", default_value = "logo_summary.txt")]
        summary_out: PathBuf,

        /// How many of the largest groups to print
        #[arg(long, default_value_t = 20)]
        top: usize,
    },

    /// Print the signature of a single image, for diagnosing degraded
    /// extractions
    Inspect {
        /// Image file to inspect
        file: PathBuf,
    },

    /// Summarize an acquisition checkpoint (JSONL)
    Provenance {
        /// Checkpoint file written by the downloader
        #[arg(short, long, value_name = "FILE")]
        checkpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Cluster {
            path,
            threshold,
            json_out,
            summary_out,
            top,
        } => run_cluster(&path, threshold, &json_out, &summary_out, top),
        Commands::Inspect { file } => run_inspect(&file),
        Commands::Provenance { checkpoint } => run_provenance(&checkpoint),
    }
}

fn run_cluster(
    path: &Path,
    threshold: f64,
    json_out: &Path,
    summary_out: &Path,
    top: usize,
) -> Result<()> {
    let scanner = CorpusScanner::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning for images…");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let files = scanner
        .discover(path)
        .with_context(|| format!("cannot cluster {}", path.display()))?;
    spinner.finish_with_message(format!("Found {} images", files.len()));

    println!("▶ Extracting signatures for {} images…", files.len());
    let bar = ProgressBar::new(files.len() as u64);
    let signatures = benchmark("signature extraction", || {
        scanner.extract_all(path, &files, |_| bar.inc(1))
    });
    bar.finish_and_clear();

    let partitioner = ClusterPartitioner::with_threshold(threshold);
    let groups = benchmark("clustering", || partitioner.partition(&signatures));

    let report = ClusterReport::build(&groups, files.len(), threshold);
    report
        .write_json(json_out)
        .with_context(|| format!("failed to write {}", json_out.display()))?;
    report
        .write_summary_file(summary_out)
        .with_context(|| format!("failed to write {}", summary_out.display()))?;

    let counts = report.kind_counts();
    println!(
        "\n✅ {} groups: {} exact, {} similar, {} unique",
        report.metadata.total_groups, counts.exact, counts.similar, counts.unique
    );

    println!("\nLargest groups:");
    for (i, group) in report.largest(top).iter().enumerate() {
        println!(
            "{:>2}. {:<8} {:>4} logos (sim {:.2})",
            i + 1,
            group.kind,
            group.count,
            group.average_similarity
        );
        if group.count <= 3 {
            println!("    {}", group.members.join(", "));
        }
    }

    println!(
        "\nReports written to {} and {}",
        json_out.display(),
        summary_out.display()
    );
    Ok(())
}

fn run_inspect(file: &Path) -> Result<()> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", file.display()))?;
    let root = file.parent().unwrap_or_else(|| Path::new("."));

    let extractor = SignatureExtractor::new();
    let signature = extractor.extract_path(root, name);
    println!("{}", serde_json::to_string_pretty(&signature)?);
    Ok(())
}

fn run_provenance(checkpoint: &Path) -> Result<()> {
    let (records, malformed) = acquisition::read_checkpoint(checkpoint)?;
    let summary = acquisition::summarize(&records, malformed);

    println!("Checkpoint: {}", checkpoint.display());
    println!("  records : {}", summary.total);
    println!("  hits    : {}", summary.hits);
    println!("  failures: {}", summary.total - summary.hits);
    if summary.malformed > 0 {
        println!("  malformed lines skipped: {}", summary.malformed);
    }

    println!("\nBy outcome:");
    for (outcome, count) in &summary.by_outcome {
        println!("  {:<15}: {:>6}", outcome.as_str(), count);
    }
    Ok(())
}

/// Run `f()`, print how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    println!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("logoclust=debug")
    } else {
        EnvFilter::new("logoclust=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
