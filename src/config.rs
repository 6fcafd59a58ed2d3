use crate::error::WindowError;

/// Horizons (in weeks) for which a lookahead delta is produced.
pub const DEFAULT_HORIZONS_WEEKS: [u32; 4] = [1, 4, 12, 24];

/// Tunables shared by every reader and aggregator of a run.
///
/// The defaults reproduce the production pipeline: one week of history is kept
/// behind the cursor, 26 weeks are buffered ahead of it, and deltas are taken
/// at 1, 4, 12 and 24 weeks.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Entries older than `target - lookback_weeks` are evicted on every advance.
    pub lookback_weeks: u32,
    /// The reader buffers observations up to `target + lookahead_weeks`.
    pub lookahead_weeks: u32,
    /// Ascending list of delta horizons, in weeks.
    pub horizons_weeks: Vec<u32>,
    /// Longest run of calendar days a gap-fill walk may step back.
    pub max_gap_days: u32,
    /// Emit a progress log line every this many lines read from a source.
    pub progress_every_lines: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_weeks: 1,
            lookahead_weeks: 26,
            horizons_weeks: DEFAULT_HORIZONS_WEEKS.to_vec(),
            max_gap_days: 10,
            progress_every_lines: 2000,
        }
    }
}

impl PipelineConfig {
    /// Checks that the window is wide enough to answer every horizon query.
    ///
    /// # Errors
    /// * `WindowError::InvalidConfig` if horizons are empty or unordered, if the
    ///   lookahead does not cover the longest horizon, or if the gap bound is zero.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.horizons_weeks.is_empty() {
            return Err(WindowError::InvalidConfig("at least one horizon is required".into()));
        }
        if self.horizons_weeks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WindowError::InvalidConfig(format!(
                "horizons must be strictly ascending, got {:?}",
                self.horizons_weeks
            )));
        }
        if self.horizons_weeks[0] == 0 {
            return Err(WindowError::InvalidConfig("horizon 0 is reserved for the current close".into()));
        }
        let longest = self.horizons_weeks[self.horizons_weeks.len() - 1];
        if self.lookahead_weeks <= longest {
            return Err(WindowError::InvalidConfig(format!(
                "lookahead of {} weeks does not cover the {}-week horizon",
                self.lookahead_weeks, longest
            )));
        }
        if self.max_gap_days == 0 {
            return Err(WindowError::InvalidConfig("max_gap_days must be positive".into()));
        }
        Ok(())
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::weeks(i64::from(self.lookback_weeks))
    }

    pub fn lookahead(&self) -> chrono::Duration {
        chrono::Duration::weeks(i64::from(self.lookahead_weeks))
    }
}
