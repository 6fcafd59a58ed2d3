use crate::config;
use crate::error::WindowError;
use crate::window;

/// Column holding the `YYYY-MM-DD` date of a data line.
const DATE_COLUMN: usize = 0;
/// Column holding the adjusted close.
const ADJ_CLOSE_COLUMN: usize = 5;
/// Column holding the traded volume.
const VOLUME_COLUMN: usize = 6;

/// Lifecycle of a reader's underlying source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// More lines may follow; the cursor sits after the last consumed line.
    Scanning,
    /// End of input reached; the window only shrinks from here on.
    Exhausted,
}

/// Forward-only cursor over one instrument's price file.
///
/// The reader owns a [`window::PriceWindow`] that it keeps wide enough to answer
/// lookups from `target - lookback` up to `target + lookahead`, where `target`
/// is the date passed to the most recent [`WindowedReader::advance`] call. Lines
/// are consumed exactly once, so targets must be supplied in non-decreasing order.
pub struct WindowedReader<R: std::io::Read> {
    name: String,
    source: csv::Reader<R>,
    record: csv::StringRecord,
    window: window::PriceWindow,
    state: ReaderState,
    lines_read: u64,
    /// Date of the newest observation inserted so far.
    frontier: Option<chrono::NaiveDate>,
    lookback: chrono::Duration,
    lookahead: chrono::Duration,
    progress_every_lines: u64,
}

impl WindowedReader<std::fs::File> {
    /// Opens `path` for sequential reading with an empty window.
    ///
    /// # Arguments
    /// * `path` - Instrument CSV file (`date,open,high,low,close,adjusted_close,volume`).
    /// * `config` - Window widths and gap-fill bound.
    ///
    /// # Errors
    /// * `WindowError::Io` if the file cannot be opened.
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        config: &config::PipelineConfig,
    ) -> Result<Self, WindowError> {
        let file = std::fs::File::open(path.as_ref())?;
        let name = path.as_ref().display().to_string();
        Ok(Self::from_reader(name, file, config))
    }
}

impl<R: std::io::Read> WindowedReader<R> {
    /// Wraps any byte source. The first line is treated as a header and skipped.
    pub fn from_reader(name: impl Into<String>, source: R, config: &config::PipelineConfig) -> Self {
        let source = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(source);

        Self {
            name: name.into(),
            source,
            record: csv::StringRecord::new(),
            window: window::PriceWindow::new(config.max_gap_days),
            state: ReaderState::Scanning,
            lines_read: 0,
            frontier: None,
            lookback: config.lookback(),
            lookahead: config.lookahead(),
            progress_every_lines: config.progress_every_lines.max(1),
        }
    }

    /// Moves the cursor to `target`.
    ///
    /// 1. Evicts window entries older than `target - lookback`.
    /// 2. Reads forward until end of input or until an observation dated on or
    ///    after `target + lookahead` has been inserted. That observation stays in
    ///    the window and the cursor stays put for the next call.
    ///
    /// Lines with an unparsable adjusted close or volume are skipped, as are lines
    /// dated before the eviction cutoff.
    ///
    /// # Errors
    /// * `WindowError::Csv` on an I/O or framing failure of the source.
    /// * `WindowError::BadDate` if a data line does not start with a `YYYY-MM-DD` date.
    pub fn advance(&mut self, target: chrono::NaiveDate) -> Result<(), WindowError> {
        let cutoff = target - self.lookback;
        let horizon = target + self.lookahead;

        let evicted = self.window.evict_before(cutoff);
        if evicted > 0 {
            tracing::trace!(reader = %self.name, evicted, %cutoff, "evicted stale observations");
        }

        if self.frontier.is_some_and(|frontier| frontier >= horizon) {
            return Ok(());
        }

        while self.state == ReaderState::Scanning {
            if !self.source.read_record(&mut self.record)? {
                self.state = ReaderState::Exhausted;
                tracing::debug!(reader = %self.name, lines = self.lines_read, "reached end of input");
                break;
            }
            self.lines_read += 1;
            if self.lines_read % self.progress_every_lines == 0 {
                tracing::debug!("Read {} lines from {}", self.lines_read, self.name);
            }

            let line = self.record.position().map_or(self.lines_read + 1, |p| p.line());
            let date = parse_date_field(&self.record, line)?;
            if date < cutoff {
                continue;
            }
            let Some(observation) = parse_observation(&self.record, date) else {
                continue;
            };

            self.window.insert(observation);
            self.frontier = Some(date);
            if date >= horizon {
                break;
            }
        }

        Ok(())
    }

    /// Gap-filled lookup of `date` in the current window.
    ///
    /// See [`window::PriceWindow::resolve`] for the resolution rules.
    pub fn resolve(&self, date: chrono::NaiveDate) -> Result<Option<window::Observation>, WindowError> {
        self.window.resolve(date)
    }

    pub fn window(&self) -> &window::PriceWindow {
        &self.window
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Releases the underlying source. Consuming `self` makes a second close impossible.
    pub fn close(self) {
        tracing::debug!(reader = %self.name, lines = self.lines_read, state = ?self.state, "closing reader");
    }
}

/// Parses the leading `YYYY-MM-DD` field of a data line.
fn parse_date_field(record: &csv::StringRecord, line: u64) -> Result<chrono::NaiveDate, WindowError> {
    let raw = record.get(DATE_COLUMN).unwrap_or_default();
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| WindowError::BadDate {
        line,
        value: raw.to_string(),
    })
}

/// Builds an observation from the adjusted close and volume columns.
///
/// Returns `None` when either field is missing or not a finite number.
fn parse_observation(record: &csv::StringRecord, date: chrono::NaiveDate) -> Option<window::Observation> {
    let adj_close = parse_finite(record.get(ADJ_CLOSE_COLUMN)?)?;
    let volume = parse_finite(record.get(VOLUME_COLUMN)?)?;
    Some(window::Observation { date, adj_close, volume })
}

/// `nan` and `inf` parse as `f64` but are not usable prices.
fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Date,Open,High,Low,Close,Adj Close,Volume\n";

    fn day(s: &str) -> chrono::NaiveDate {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reader_over(body: &str) -> WindowedReader<std::io::Cursor<Vec<u8>>> {
        let data = format!("{HEADER}{body}").into_bytes();
        WindowedReader::from_reader("TEST", std::io::Cursor::new(data), &config::PipelineConfig::default())
    }

    /// One line per day from `start` for `days` days, closes counting up from 100.
    fn daily_rows(start: &str, days: i64) -> String {
        let start = day(start);
        (0..days)
            .map(|i| {
                let d = start + chrono::Duration::days(i);
                format!("{d},1,1,1,1,{}.0,{}\n", 100 + i, 1000 + i)
            })
            .collect()
    }

    #[test]
    fn header_line_is_not_an_observation() {
        let mut reader = reader_over("2020-01-01,1,1,1,1,100.0,1000\n");
        assert_eq!(reader.name(), "TEST");
        assert!(reader.window().is_empty());
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.window().len(), 1);
        assert_eq!(reader.lines_read(), 1);
    }

    #[test]
    fn exact_dates_resolve_to_parsed_values() {
        let mut reader = reader_over("2020-01-01,1,1,1,1,100.0,1000\n2020-01-02,1,1,1,1,101.5,2000\n");
        reader.advance(day("2020-01-01")).unwrap();
        let obs = reader.resolve(day("2020-01-02")).unwrap().unwrap();
        assert_eq!((obs.adj_close, obs.volume), (101.5, 2000.0));
    }

    #[test]
    fn malformed_numeric_fields_are_skipped() {
        let mut reader = reader_over(
            "2020-01-01,1,1,1,1,100.0,1000\n2020-01-02,1,1,1,1,null,1000\n2020-01-03,1,1,1,1,102.0,\n",
        );
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.window().len(), 1);
        // the skipped dates gap-fill back to the last good line
        assert_eq!(reader.resolve(day("2020-01-03")).unwrap().unwrap().adj_close, 100.0);
    }

    #[test]
    fn stray_quote_skips_only_its_line() {
        let mut reader = reader_over(
            "2020-01-01,1,1,1,1,100.0,1000\n\
             2020-01-02,1,1,1,1,\"101.0,1000\n\
             2020-01-03,1,1,1,1,102.0,1000\n\
             2020-01-06,1,1,1,1,103.0,1000\n\
             2020-01-07,1,1,1,1,104.0,1000\n",
        );
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.window().len(), 4);
        assert_eq!(reader.window().last_date(), Some(day("2020-01-07")));
        assert_eq!(reader.resolve(day("2020-01-02")).unwrap().unwrap().adj_close, 100.0);
        assert_eq!(reader.resolve(day("2020-01-07")).unwrap().unwrap().adj_close, 104.0);
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let mut reader = reader_over(
            "2020-01-01,1,1,1,1,100.0,1000\n2020-01-02,1,1,1,1,nan,1000\n2020-01-03,1,1,1,1,5.0,inf\n",
        );
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.window().len(), 1);
        assert_eq!(reader.window().last_date(), Some(day("2020-01-01")));
    }

    #[test]
    fn short_lines_are_skipped() {
        let mut reader = reader_over("2020-01-01,1,1\n2020-01-02,1,1,1,1,5.0,7\n");
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.window().first_date(), Some(day("2020-01-02")));
    }

    #[test]
    fn bad_date_is_fatal() {
        let mut reader = reader_over("01/02/2020,1,1,1,1,5.0,7\n");
        let err = reader.advance(day("2020-01-01")).unwrap_err();
        assert!(matches!(err, WindowError::BadDate { .. }));
    }

    #[test]
    fn read_ahead_stops_at_lookahead_horizon() {
        let mut reader = reader_over(&daily_rows("2020-01-01", 400));
        reader.advance(day("2020-01-01")).unwrap();
        let horizon = day("2020-01-01") + chrono::Duration::weeks(26);
        assert_eq!(reader.window().last_date(), Some(horizon));
        assert_eq!(reader.state(), ReaderState::Scanning);
    }

    #[test]
    fn advance_evicts_beyond_lookback() {
        let mut reader = reader_over(&daily_rows("2020-01-01", 400));
        reader.advance(day("2020-01-01")).unwrap();
        reader.advance(day("2020-02-01")).unwrap();
        assert_eq!(reader.window().first_date(), Some(day("2020-01-25")));
        assert_eq!(reader.resolve(day("2020-01-24")).unwrap(), None);
    }

    #[test]
    fn lines_before_cutoff_are_never_buffered() {
        let mut reader = reader_over(&daily_rows("2019-01-01", 30));
        reader.advance(day("2019-01-20")).unwrap();
        assert_eq!(reader.window().first_date(), Some(day("2019-01-13")));
    }

    #[test]
    fn repeated_advance_gives_same_answers() {
        let mut reader = reader_over(&daily_rows("2020-01-01", 400));
        reader.advance(day("2020-03-01")).unwrap();
        let probes: Vec<_> = (0..200)
            .map(|i| reader.resolve(day("2020-02-23") + chrono::Duration::days(i)).unwrap())
            .collect();
        reader.advance(day("2020-03-01")).unwrap();
        let again: Vec<_> = (0..200)
            .map(|i| reader.resolve(day("2020-02-23") + chrono::Duration::days(i)).unwrap())
            .collect();
        assert_eq!(probes, again);
    }

    #[test]
    fn reader_reports_exhaustion() {
        let mut reader = reader_over("2020-01-01,1,1,1,1,100.0,1000\n");
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.state(), ReaderState::Exhausted);
        reader.advance(day("2020-01-02")).unwrap();
        assert_eq!(reader.resolve(day("2020-01-02")).unwrap().unwrap().adj_close, 100.0);
        reader.close();
    }

    #[test]
    fn duplicate_dates_keep_last_line() {
        let mut reader = reader_over("2020-01-01,1,1,1,1,1.0,1\n2020-01-01,1,1,1,1,2.0,2\n");
        reader.advance(day("2020-01-01")).unwrap();
        assert_eq!(reader.resolve(day("2020-01-01")).unwrap().unwrap().adj_close, 2.0);
    }
}
