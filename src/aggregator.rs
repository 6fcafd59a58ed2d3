use crate::error::WindowError;
use crate::window;

/// Current adjusted close followed by the relative change at each horizon.
///
/// `values[0]` is the close on the query date (0.0 when there is no history yet),
/// `values[i]` for `i >= 1` is the delta at `horizons_weeks[i - 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaVector {
    pub values: Vec<f64>,
}

impl DeltaVector {
    /// Fixed-point, five decimals: `"0.10000"`.
    pub fn formatted(&self) -> Vec<String> {
        self.values.iter().map(|v| format!("{:.5}", v)).collect()
    }
}

/// Relative change from `current` to `future`.
///
/// Policy: the delta is 0.0 whenever it cannot be computed, i.e. when either
/// price is unknown or the current price is exactly zero.
pub fn relative_delta(current: Option<f64>, future: Option<f64>) -> f64 {
    match (current, future) {
        (Some(current), Some(future)) if current != 0.0 => (future - current) / current,
        _ => 0.0,
    }
}

/// Computes the delta vector for `date` from a window already advanced to `date`.
///
/// Each horizon date is `date + 7 * weeks` days and is resolved with the same
/// gap-fill rule as the current date.
///
/// # Arguments
/// * `window` - Window covering at least `date` through the longest horizon.
/// * `date` - Query date.
/// * `horizons_weeks` - Ascending horizons.
///
/// # Errors
/// * `WindowError::GapFillExceeded` propagated from a lookup.
pub fn aggregate(
    window: &window::PriceWindow,
    date: chrono::NaiveDate,
    horizons_weeks: &[u32],
) -> Result<DeltaVector, WindowError> {
    let current = window.resolve(date)?.map(|o| o.adj_close);

    let mut values = Vec::with_capacity(horizons_weeks.len() + 1);
    values.push(current.unwrap_or(0.0));
    for weeks in horizons_weeks {
        let ahead = date + chrono::Duration::days(7 * i64::from(*weeks));
        let future = window.resolve(ahead)?.map(|o| o.adj_close);
        values.push(relative_delta(current, future));
    }

    Ok(DeltaVector { values })
}
