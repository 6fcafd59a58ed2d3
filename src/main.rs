use lookahead_deltas::{cli, config, driver, selector, utils};

use tracing_subscriber::prelude::*;

/// Installs the global tracing subscriber.
///
/// Logs go to stdout, filtered by `RUST_LOG` (default `info`), and are also
/// appended to `log_file` when one is given.
fn init_tracing(log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| anyhow::anyhow!("failed to create log directory {parent:?}: {e}"))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("failed to open log file {path:?}: {e}"))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            // the writer must outlive every log call
            let _guard = Box::leak(Box::new(guard));
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

/// Runs the requested pipeline step.
fn run(args: &cli::Args, config: &config::PipelineConfig) -> anyhow::Result<()> {
    match &args.command {
        cli::Command::Select { data_dir, last_date } => {
            tracing::info!("Picked Dir: {}", data_dir.display());
            tracing::info!("Picked Last Date: {}", last_date);
            let last_date = last_date.format("%Y-%m-%d").to_string();
            selector::pick_assets(data_dir, &last_date)?;
        }
        cli::Command::Aggregate { data_dir, start, end } => {
            tracing::info!("Picked Dir: {}", data_dir.display());
            tracing::info!("Picked First Date: {}", start);
            tracing::info!("Picked Last Date: {}", end);
            driver::run_aggregation(data_dir, *start, *end, config)?;
        }
    }
    anyhow::Ok(())
}

/// Main entry point of the application.
///
/// 1. Parses command-line arguments and installs logging.
/// 2. Determines the number of threads to use.
/// 3. Runs either instrument selection or delta aggregation.
fn main() -> anyhow::Result<()> {
    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let mut config = config::PipelineConfig::default();
    if let Some(max_gap_days) = args.max_gap_days {
        config.max_gap_days = max_gap_days;
    }
    config.validate()?;

    match args.threads {
        Some(n) => {
            let max_threads = num_cpus::get();
            let n = if n > max_threads {
                tracing::warn!("⚠️ Limiting thread count to {} (max available)", max_threads);
                max_threads
            } else {
                n
            };
            tracing::info!("🚀 Using {} thread(s)", n);
            let local_pool = utils::configure_thread_pool(n)?;
            local_pool.install(|| run(&args, &config))?;
        }
        None => {
            tracing::info!("🚀 Using {} thread(s)", rayon::current_num_threads());
            run(&args, &config)?;
        }
    }

    tracing::info!("✅ Completed in {:.3} seconds", total_start.elapsed().as_secs_f64());
    Ok(())
}
