/// Errors raised while reading an instrument's series or resolving dates in its window.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: invalid date {value:?}")]
    BadDate { line: u64, value: String },

    #[error("no observation within {max_days} days before {date}")]
    GapFillExceeded { date: chrono::NaiveDate, max_days: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
