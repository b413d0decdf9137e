//! CLI argument parsing
//!
//! Flags may be written with one or two leading dashes, and values may be
//! attached with `=` (`--num-workers=4`) or passed as the next argument.

use crate::{
    DEFAULT_EXTENSIONS, DEFAULT_TOOL, ReportMode, RunOptions, default_output_dir,
    default_workers, parse_extensions,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Run(DecompileArgs),
    Help,
    Version,
}

#[derive(Debug, Clone)]
pub struct DecompileArgs {
    pub target_dir: String,
    pub extensions: String,
    pub output_dir: Option<String>,
    pub respect_case: bool,
    pub recursive: bool,
    pub allow_duplicates: bool,
    pub workers: usize,
    pub tool_errors_fatal: bool,
    pub tool: String,
    pub timeout_secs: Option<u64>,
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
}

impl Default for DecompileArgs {
    fn default() -> Self {
        Self {
            target_dir: String::new(),
            extensions: DEFAULT_EXTENSIONS.to_string(),
            output_dir: None,
            respect_case: false,
            recursive: false,
            allow_duplicates: false,
            workers: default_workers(),
            tool_errors_fatal: false,
            tool: DEFAULT_TOOL.to_string(),
            timeout_secs: None,
            verbose: false,
            quiet: false,
            json: false,
        }
    }
}

impl DecompileArgs {
    /// Build run options from parsed flags.
    ///
    /// The tool path is taken as given; resolving it is left to the caller.
    #[must_use]
    pub fn to_run_options(&self) -> RunOptions {
        let target_dir = PathBuf::from(&self.target_dir);
        let output_dir = self
            .output_dir
            .as_ref()
            .map_or_else(|| default_output_dir(&target_dir), PathBuf::from);

        let report = if self.quiet {
            ReportMode::Silent
        } else if self.verbose {
            ReportMode::Verbose
        } else {
            ReportMode::Bar
        };

        RunOptions {
            output_dir,
            extensions: parse_extensions(&self.extensions, self.respect_case),
            respect_case: self.respect_case,
            recursive: self.recursive,
            allow_duplicates: self.allow_duplicates,
            workers: self.workers,
            tool_errors_fatal: self.tool_errors_fatal,
            tool_path: PathBuf::from(&self.tool),
            tool_timeout: self.timeout_secs.map(Duration::from_secs),
            report,
            ..RunOptions::new(target_dir)
        }
    }
}

/// Parse command line arguments (including the program name at index 0)
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = DecompileArgs::default();
    let mut positional: Vec<&str> = Vec::new();
    let mut i = 1;

    while i < args.len() {
        let arg = args[i].as_str();

        let Some((name, inline)) = split_flag(arg) else {
            positional.push(arg);
            i += 1;
            continue;
        };

        match name {
            "h" | "help" => return Ok(CliArgs { command: Command::Help }),
            "version" => {
                return Ok(CliArgs {
                    command: Command::Version,
                });
            }
            "e" => parsed.extensions = take_value(name, inline, args, &mut i)?,
            "o" => parsed.output_dir = Some(take_value(name, inline, args, &mut i)?),
            "ilspy" => parsed.tool = take_value(name, inline, args, &mut i)?,
            "num-workers" => {
                let value = take_value(name, inline, args, &mut i)?;
                let workers: usize = value
                    .parse()
                    .map_err(|_| "--num-workers must be a number".to_string())?;
                if workers == 0 {
                    return Err("--num-workers must be greater than zero".to_string());
                }
                parsed.workers = workers;
            }
            "timeout" => {
                let value = take_value(name, inline, args, &mut i)?;
                let secs: u64 = value
                    .parse()
                    .map_err(|_| "--timeout must be a positive integer".to_string())?;
                if secs == 0 {
                    return Err("--timeout must be greater than zero".to_string());
                }
                parsed.timeout_secs = Some(secs);
            }
            "r" => parsed.recursive = parse_bool(name, inline)?,
            "respect-file-case" => parsed.respect_case = parse_bool(name, inline)?,
            "allow-duplicates" => parsed.allow_duplicates = parse_bool(name, inline)?,
            "no-ilspy-errors" => parsed.tool_errors_fatal = parse_bool(name, inline)?,
            "v" => parsed.verbose = parse_bool(name, inline)?,
            "q" | "quiet" => parsed.quiet = parse_bool(name, inline)?,
            "json" => parsed.json = parse_bool(name, inline)?,
            _ => return Err(format!("Unknown option: {arg}")),
        }
        i += 1;
    }

    match positional.as_slice() {
        [target] => parsed.target_dir = (*target).to_string(),
        [] => {
            return Err(
                "please specify the directory to search as the final argument".to_string(),
            );
        }
        [_, extra, ..] => return Err(format!("Unexpected argument: {extra}")),
    }

    if parse_extensions(&parsed.extensions, parsed.respect_case).is_empty() {
        return Err("please specify a comma separated list of file extensions".to_string());
    }

    Ok(CliArgs {
        command: Command::Run(parsed),
    })
}

/// Split `-name`, `--name` or `--name=value` into the name and inline value.
fn split_flag(arg: &str) -> Option<(&str, Option<&str>)> {
    if arg == "-" || !arg.starts_with('-') {
        return None;
    }
    let body = arg.strip_prefix("--").unwrap_or(&arg[1..]);
    match body.split_once('=') {
        Some((name, value)) => Some((name, Some(value))),
        None => Some((body, None)),
    }
}

fn take_value(
    name: &str,
    inline: Option<&str>,
    args: &[String],
    i: &mut usize,
) -> Result<String, String> {
    if let Some(value) = inline {
        return Ok(value.to_string());
    }
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("-{name} requires a value"))
}

fn parse_bool(name: &str, inline: Option<&str>) -> Result<bool, String> {
    match inline {
        None | Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(format!("invalid boolean value '{other}' for -{name}")),
    }
}
