/// Configures a custom Rayon thread pool with specified size.
///
/// Selection scans files on this pool and the batch driver advances the
/// instruments of one date on it.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Parses a date string in the format `%Y-%m-%d`.
///
/// # Examples
///
/// ```
/// let d = lookahead_deltas::utils::parse_date("2020-04-01").unwrap();
/// assert_eq!(d.to_string(), "2020-04-01");
/// ```
pub fn parse_date(date_str: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date {:?} (expected YYYY-MM-DD): {}", date_str, e))
}

/// Every calendar day from `start` to `end`, both inclusive.
///
/// Yields nothing when `end` precedes `start`.
pub fn calendar_days(
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> impl Iterator<Item = chrono::NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Number of calendar days in `start..=end`.
pub fn day_count(start: chrono::NaiveDate, end: chrono::NaiveDate) -> u64 {
    u64::try_from((end - start).num_days() + 1).unwrap_or(0)
}
