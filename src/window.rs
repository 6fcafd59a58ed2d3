use crate::error::WindowError;

/// One parsed data line: the adjusted close and the volume traded on `date`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: chrono::NaiveDate,
    pub adj_close: f64,
    pub volume: f64,
}

/// Date-ordered buffer of observations for a single instrument.
///
/// The window only ever holds what its owning reader pushed into it; it knows
/// nothing about files. Lookups apply the holiday gap-fill rule: a date without
/// an observation takes the price of the closest earlier trading day.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    entries: std::collections::BTreeMap<chrono::NaiveDate, Observation>,
    max_gap_days: u32,
}

impl PriceWindow {
    /// Creates an empty window whose gap-fill walk never steps back more than
    /// `max_gap_days` calendar days.
    pub fn new(max_gap_days: u32) -> Self {
        Self {
            entries: std::collections::BTreeMap::new(),
            max_gap_days,
        }
    }

    /// Inserts an observation, replacing any earlier one recorded for the same date.
    pub fn insert(&mut self, observation: Observation) {
        self.entries.insert(observation.date, observation);
    }

    /// Drops every entry dated strictly before `cutoff`.
    ///
    /// # Returns
    /// * `usize` - Number of evicted entries.
    pub fn evict_before(&mut self, cutoff: chrono::NaiveDate) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let before = self.entries.len();
        self.entries = self.entries.split_off(&cutoff);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_date(&self) -> Option<chrono::NaiveDate> {
        self.entries.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<chrono::NaiveDate> {
        self.entries.keys().next_back().copied()
    }

    /// Looks up the observation in effect on `date`.
    ///
    /// Resolution order:
    /// 1. Empty window, or `date` before the oldest entry: `None` (no history yet).
    /// 2. Exact hit: that observation.
    /// 3. `date` after the newest entry: the newest entry. The series simply
    ///    ends there, so the last known price carries forward.
    /// 4. Otherwise the nearest earlier entry, provided it lies at most
    ///    `max_gap_days` calendar days back.
    ///
    /// # Errors
    /// * `WindowError::GapFillExceeded` if case 4 would need to walk back further
    ///   than the configured bound.
    pub fn resolve(&self, date: chrono::NaiveDate) -> Result<Option<Observation>, WindowError> {
        let (Some((first, _)), Some((last, newest))) =
            (self.entries.first_key_value(), self.entries.last_key_value())
        else {
            return Ok(None);
        };
        if date < *first {
            return Ok(None);
        }
        if let Some(observation) = self.entries.get(&date) {
            return Ok(Some(*observation));
        }
        if date > *last {
            return Ok(Some(*newest));
        }

        // first < date < last here, so an earlier entry always exists
        let Some((prior, observation)) = self.entries.range(..date).next_back() else {
            return Ok(None);
        };
        if (date - *prior).num_days() > i64::from(self.max_gap_days) {
            return Err(WindowError::GapFillExceeded {
                date,
                max_days: self.max_gap_days,
            });
        }
        Ok(Some(*observation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> chrono::NaiveDate {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn obs(date: &str, adj_close: f64, volume: f64) -> Observation {
        Observation { date: day(date), adj_close, volume }
    }

    fn window_of(rows: &[(&str, f64, f64)]) -> PriceWindow {
        let mut window = PriceWindow::new(10);
        for (date, close, volume) in rows {
            window.insert(obs(date, *close, *volume));
        }
        window
    }

    #[test]
    fn empty_window_resolves_to_none() {
        let window = PriceWindow::new(10);
        assert!(window.is_empty());
        assert_eq!(window.resolve(day("2020-01-01")).unwrap(), None);
    }

    #[test]
    fn exact_date_returns_its_observation() {
        let window = window_of(&[("2020-01-02", 10.0, 100.0), ("2020-01-03", 11.0, 200.0)]);
        assert_eq!(window.resolve(day("2020-01-03")).unwrap(), Some(obs("2020-01-03", 11.0, 200.0)));
    }

    #[test]
    fn date_before_oldest_entry_has_no_history() {
        let window = window_of(&[("2020-01-02", 10.0, 100.0)]);
        assert_eq!(window.resolve(day("2020-01-01")).unwrap(), None);
    }

    #[test]
    fn weekend_resolves_to_preceding_friday() {
        // 2020-01-03 is a Friday, 2020-01-06 a Monday
        let window = window_of(&[("2020-01-03", 50.0, 10.0), ("2020-01-06", 55.0, 12.0)]);
        let friday = obs("2020-01-03", 50.0, 10.0);
        assert_eq!(window.resolve(day("2020-01-04")).unwrap(), Some(friday));
        assert_eq!(window.resolve(day("2020-01-05")).unwrap(), Some(friday));
    }

    #[test]
    fn gap_fill_never_looks_forward() {
        let window = window_of(&[
            ("2020-01-01", 1.0, 1.0),
            ("2020-01-05", 5.0, 5.0),
            ("2020-01-09", 9.0, 9.0),
        ]);
        for offset in 0..9 {
            let date = day("2020-01-01") + chrono::Duration::days(offset);
            let resolved = window.resolve(date).unwrap().unwrap();
            assert!(resolved.date <= date, "{date} resolved to later {}", resolved.date);
        }
    }

    #[test]
    fn date_past_newest_entry_carries_last_price() {
        let window = window_of(&[("2020-01-01", 1.0, 1.0), ("2020-01-02", 2.0, 3.0)]);
        let resolved = window.resolve(day("2020-06-01")).unwrap();
        assert_eq!(resolved, Some(obs("2020-01-02", 2.0, 3.0)));
    }

    #[test]
    fn gap_longer_than_bound_is_an_error() {
        let window = window_of(&[("2020-01-01", 1.0, 1.0), ("2020-02-01", 2.0, 2.0)]);
        assert_eq!(window.resolve(day("2020-01-11")).unwrap().map(|o| o.adj_close), Some(1.0));
        let err = window.resolve(day("2020-01-12")).unwrap_err();
        assert!(matches!(err, WindowError::GapFillExceeded { max_days: 10, .. }));
    }

    #[test]
    fn eviction_keeps_cutoff_date() {
        let mut window = window_of(&[
            ("2020-01-01", 1.0, 1.0),
            ("2020-01-02", 2.0, 1.0),
            ("2020-01-03", 3.0, 1.0),
        ]);
        assert_eq!(window.evict_before(day("2020-01-02")), 1);
        assert_eq!(window.first_date(), Some(day("2020-01-02")));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn insert_overwrites_same_date() {
        let mut window = window_of(&[("2020-01-01", 1.0, 1.0)]);
        window.insert(obs("2020-01-01", 4.0, 2.0));
        assert_eq!(window.len(), 1);
        assert_eq!(window.resolve(day("2020-01-01")).unwrap().unwrap().adj_close, 4.0);
    }
}
