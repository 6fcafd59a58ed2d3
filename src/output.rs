use crate::aggregator;

use anyhow::Context;
use chrono::Datelike;
use std::io::Write;

/// Output sub-directory inside the data directory.
pub const OUTPUT_DIR: &str = "lookahead_deltas";

type GzWriter = flate2::write::GzEncoder<std::io::BufWriter<std::fs::File>>;

/// Path of the output file for `year`: `<data_dir>/lookahead_deltas/<year>.txt.gz`.
pub fn year_file_path<P: AsRef<std::path::Path>>(data_dir: P, year: i32) -> std::path::PathBuf {
    data_dir.as_ref().join(OUTPUT_DIR).join(format!("{}.txt.gz", year))
}

/// One tab-separated output line, newline included.
pub fn format_line(date: chrono::NaiveDate, instrument: &str, deltas: &aggregator::DeltaVector) -> String {
    let mut cols = Vec::with_capacity(deltas.values.len() + 2);
    cols.push(date.format("%Y-%m-%d").to_string());
    cols.push(instrument.to_string());
    cols.extend(deltas.formatted());
    format!("{}\n", cols.join("\t"))
}

/// Routes output lines into one gzip file per calendar year.
///
/// A year's file is recreated from scratch the first time a line of that year
/// is written; the previous year's file is finished before switching.
pub struct YearPartitionedWriter {
    data_dir: std::path::PathBuf,
    current: Option<(i32, GzWriter)>,
    lines_in_year: u64,
}

impl YearPartitionedWriter {
    /// Creates `<data_dir>/lookahead_deltas` if needed. No file is opened yet.
    pub fn new<P: AsRef<std::path::Path>>(data_dir: P) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let out_dir = data_dir.join(OUTPUT_DIR);
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        anyhow::Ok(Self {
            data_dir,
            current: None,
            lines_in_year: 0,
        })
    }

    /// Makes `year` the active partition, opening its file if it is not already open.
    pub fn enter_year(&mut self, year: i32) -> anyhow::Result<()> {
        if matches!(self.current, Some((open_year, _)) if open_year == year) {
            return anyhow::Ok(());
        }
        self.finish_current()?;

        let path = year_file_path(&self.data_dir, year);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::info!("Removed stale {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
        let file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let encoder = flate2::write::GzEncoder::new(std::io::BufWriter::new(file), flate2::Compression::default());
        tracing::info!("Writing {}", path.display());

        self.current = Some((year, encoder));
        anyhow::Ok(())
    }

    /// Writes one record into the file of `date`'s year.
    pub fn write_record(
        &mut self,
        date: chrono::NaiveDate,
        instrument: &str,
        deltas: &aggregator::DeltaVector,
    ) -> anyhow::Result<()> {
        self.enter_year(date.year())?;
        let line = format_line(date, instrument, deltas);
        if let Some((_, writer)) = self.current.as_mut() {
            writer.write_all(line.as_bytes())?;
            self.lines_in_year += 1;
        }
        anyhow::Ok(())
    }

    /// Writes the gzip trailer and flushes the active file, if any.
    fn finish_current(&mut self) -> anyhow::Result<()> {
        if let Some((year, writer)) = self.current.take() {
            let mut inner = writer.finish().with_context(|| format!("failed to finish {} output", year))?;
            inner.flush()?;
            tracing::debug!(year, lines = self.lines_in_year, "closed year output");
            self.lines_in_year = 0;
        }
        anyhow::Ok(())
    }

    /// Finishes the last open file.
    pub fn close(mut self) -> anyhow::Result<()> {
        self.finish_current()
    }
}
