/// Default terminal record date expected by `select`.
pub const DEFAULT_LAST_DATE: &str = "2020-04-01";

/// Pipeline step requested on the command line.
#[derive(Debug)]
pub enum Command {
    /// Pick the instruments whose data ends on `last_date`.
    Select {
        data_dir: std::path::PathBuf,
        last_date: chrono::NaiveDate,
    },
    /// Write lookahead deltas for every selected instrument over `start..=end`.
    Aggregate {
        data_dir: std::path::PathBuf,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub command: Command,
    pub threads: Option<usize>,
    pub max_gap_days: Option<u32>,
    pub log_file: Option<std::path::PathBuf>,
}

fn data_dir_arg() -> clap::Arg {
    clap::Arg::new("data_dir")
        .short('d')
        .long("data-dir")
        .help("Directory holding the stocks/ and etfs/ data directories")
        .required(true)
        .num_args(1)
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

fn date_arg(id: &'static str, short: char, long: &'static str, help: &'static str) -> clap::Arg {
    clap::Arg::new(id)
        .short(short)
        .long(long)
        .help(help)
        .num_args(1)
        .value_parser(clap::builder::ValueParser::new(parse_date_arg))
}

/// Builds the `clap` command tree.
pub fn command() -> clap::Command {
    clap::Command::new("lookahead-deltas")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Select instruments and generate forward-looking price deltas")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of threads to use (default: all available)")
                .global(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("max_gap_days")
                .long("max-gap-days")
                .help("Longest run of calendar days without data that gap-filling may bridge (default: 10)")
                .global(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_u32_positive)),
        )
        .arg(
            clap::Arg::new("log_file")
                .long("log-file")
                .help("Also append logs to this file")
                .global(true)
                .num_args(1)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .subcommand(
            clap::Command::new("select")
                .about("Pick the instruments whose last record matches the given date")
                .arg(data_dir_arg())
                .arg(
                    date_arg("last_date", 'l', "last-date", "Last date of asset data expected (YYYY-MM-DD)")
                        .default_value(DEFAULT_LAST_DATE),
                ),
        )
        .subcommand(
            clap::Command::new("aggregate")
                .about("Compute lookahead deltas for the selected instruments")
                .arg(data_dir_arg())
                .arg(date_arg("start", 's', "start", "First date of lookahead aggregates (YYYY-MM-DD)").required(true))
                .arg(date_arg("end", 'e', "end", "Last date of lookahead aggregates (YYYY-MM-DD)").required(true)),
        )
}

impl Args {
    /// Parses the process arguments, exiting with a usage message on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(itr)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let command = match matches.subcommand() {
            Some(("aggregate", sub)) => Command::Aggregate {
                data_dir: required(sub, "data_dir"),
                start: required(sub, "start"),
                end: required(sub, "end"),
            },
            Some(("select", sub)) => Command::Select {
                data_dir: required(sub, "data_dir"),
                last_date: required(sub, "last_date"),
            },
            _ => unreachable!("subcommand_required is set"),
        };

        Args {
            command,
            threads: matches.get_one::<usize>("threads").copied(),
            max_gap_days: matches.get_one::<u32>("max_gap_days").copied(),
            log_file: matches.get_one::<std::path::PathBuf>("log_file").cloned(),
        }
    }
}

/// Clap enforces presence of required and defaulted arguments before this runs.
fn required<T: Clone + Send + Sync + 'static>(matches: &clap::ArgMatches, id: &str) -> T {
    matches
        .get_one::<T>(id)
        .cloned()
        .unwrap_or_else(|| unreachable!("argument {id} is required"))
}

fn parse_date_arg(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Not a YYYY-MM-DD date: {}", e))
}

/// Validates that the number of threads is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the number of threads.
///
/// # Returns
/// * `Result<usize>` - Validated number of threads.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_u32_positive(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_defaults_last_date() {
        let args = Args::try_parse_from(["lookahead-deltas", "select", "-d", "data"]).unwrap();
        match args.command {
            Command::Select { data_dir, last_date } => {
                assert_eq!(data_dir, std::path::PathBuf::from("data"));
                assert_eq!(last_date.to_string(), DEFAULT_LAST_DATE);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn aggregate_requires_both_dates() {
        assert!(Args::try_parse_from(["lookahead-deltas", "aggregate", "-d", "data", "-s", "2020-01-01"]).is_err());
        let args = Args::try_parse_from([
            "lookahead-deltas", "aggregate", "-d", "data", "-s", "2020-01-01", "-e", "2020-03-31", "-t", "2",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Aggregate { .. }));
        assert_eq!(args.threads, Some(2));
    }

    #[test]
    fn bad_dates_and_zero_threads_are_rejected() {
        assert!(Args::try_parse_from(["lookahead-deltas", "select", "-d", "x", "-l", "04/01/2020"]).is_err());
        assert!(Args::try_parse_from(["lookahead-deltas", "select", "-d", "x", "-t", "0"]).is_err());
        assert!(Args::try_parse_from(["lookahead-deltas", "select", "-d", "x", "--max-gap-days", "0"]).is_err());
    }
}
