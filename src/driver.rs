use crate::aggregator;
use crate::config;
use crate::instrument;
use crate::output;
use crate::reader;
use crate::utils;

use anyhow::Context;
use chrono::Datelike;
use rayon::prelude::*;

/// Totals reported at the end of an aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub instruments: usize,
    pub days: u64,
    pub records: u64,
}

/// Opens one reader per manifest entry, in identifier order.
fn open_readers(
    manifest: &instrument::Manifest,
    config: &config::PipelineConfig,
) -> anyhow::Result<Vec<(String, reader::WindowedReader<std::fs::File>)>> {
    manifest
        .iter()
        .map(|(id, record)| {
            let reader = reader::WindowedReader::open(&record.filepath, config)
                .with_context(|| format!("failed to open {} ({})", id, record.filepath.display()))?;
            anyhow::Ok((id.clone(), reader))
        })
        .collect()
}

fn progress_bar(days: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(days);
    if let Ok(style) = indicatif::ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} days ({msg})",
    ) {
        bar.set_style(style);
    }
    bar
}

/// Computes lookahead deltas for every instrument of `manifest` on every
/// calendar day of `start..=end` and writes them to per-year gzip files under
/// `<data_dir>/lookahead_deltas`.
///
/// Instruments of one date are advanced in parallel on the current Rayon pool;
/// lines are still written in date-then-identifier order.
///
/// # Arguments
/// * `data_dir` - Data directory receiving the `lookahead_deltas` output.
/// * `start`, `end` - Inclusive date range.
/// * `manifest` - Selected instruments.
/// * `config` - Window and horizon settings.
///
/// # Errors
/// * If the configuration is invalid or `end` precedes `start`.
/// * If an instrument file cannot be opened or read.
/// * If a gap-fill walk exceeds its bound.
/// * If output cannot be written.
pub fn process_data<P: AsRef<std::path::Path>>(
    data_dir: P,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    manifest: &instrument::Manifest,
    config: &config::PipelineConfig,
) -> anyhow::Result<RunSummary> {
    config.validate()?;
    if end < start {
        anyhow::bail!("end date {} precedes start date {}", end, start);
    }

    let mut readers = open_readers(manifest, config)?;
    let mut writer = output::YearPartitionedWriter::new(data_dir.as_ref())?;
    let days = utils::day_count(start, end);
    let bar = progress_bar(days);
    let mut records = 0u64;

    tracing::info!(instruments = readers.len(), days, "🚀 Aggregating {} .. {}", start, end);

    for date in utils::calendar_days(start, end) {
        writer.enter_year(date.year())?;

        let rows = readers
            .par_iter_mut()
            .map(|(id, reader)| {
                reader
                    .advance(date)
                    .and_then(|_| aggregator::aggregate(reader.window(), date, &config.horizons_weeks))
                    .with_context(|| format!("failed to aggregate {} on {}", id, date))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        for ((id, _), deltas) in readers.iter().zip(&rows) {
            writer.write_record(date, id, deltas)?;
            records += 1;
        }

        bar.inc(1);
        if date.month() == 12 && date.day() == 31 {
            bar.set_message(format!("{} done", date.year()));
        }
    }
    bar.finish_and_clear();

    writer.close()?;
    let instruments = readers.len();
    for (_, reader) in readers {
        reader.close();
    }

    tracing::info!("✅ Wrote {} record(s) for {} instrument(s) over {} day(s)", records, instruments, days);
    anyhow::Ok(RunSummary { instruments, days, records })
}

/// Loads the selection manifest from `data_dir` and runs [`process_data`] on it.
pub fn run_aggregation<P: AsRef<std::path::Path>>(
    data_dir: P,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    config: &config::PipelineConfig,
) -> anyhow::Result<RunSummary> {
    let manifest = instrument::load_manifest(data_dir.as_ref())?;
    tracing::info!("Loaded {} selected instrument(s)", manifest.len());
    process_data(data_dir, start, end, &manifest, config)
}
