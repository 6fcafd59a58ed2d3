//! Lookahead price-delta generation for a universe of instruments.
//!
//! Two steps: [`selector`] picks the instruments whose data ends on a target
//! date and writes a manifest; [`driver`] walks a calendar range and, for each
//! day and instrument, asks a [`reader::WindowedReader`] for the current close
//! and its relative change 1, 4, 12 and 24 weeks ahead.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod instrument;
pub mod output;
pub mod reader;
pub mod selector;
pub mod utils;
pub mod window;
