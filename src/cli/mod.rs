//! Command-line interface: argument parsing and summary output

pub mod args;
pub mod output;
