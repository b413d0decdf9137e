//! Batch decompiler CLI (bulkdecomp) - Main binary entry point

use bulkdecomp::cli::args::{Command, DecompileArgs, parse_args};
use bulkdecomp::cli::output::{format_json, format_text};
use bulkdecomp::services::runner::find_executable;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let cli_args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let decompile_args = match cli_args.command {
        Command::Help => {
            print_help();
            return;
        }
        Command::Version => {
            print_version();
            return;
        }
        Command::Run(decompile_args) => decompile_args,
    };

    init_logger(decompile_args.verbose);

    process::exit(handle_run(&decompile_args));
}

/// `RUST_LOG` wins; otherwise `-v` raises the default level so per-file lines show.
fn init_logger(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn handle_run(args: &DecompileArgs) -> i32 {
    let Some(tool_path) = find_executable(Path::new(&args.tool)) else {
        eprintln!(
            "Error: failed to find the specified decompiler binary ('{}')",
            args.tool
        );
        return 2;
    };

    let mut opts = args.to_run_options();
    opts.tool_path = tool_path;

    if !args.quiet {
        eprintln!(
            "Decompiling: {} -> {}",
            opts.target_dir.display(),
            opts.output_dir.display()
        );
    }

    let summary = match bulkdecomp::run(&opts) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return match e {
                bulkdecomp::Error::InvalidInput(_) => 2,
                bulkdecomp::Error::Tool(_) => 3,
                _ => 4,
            };
        }
    };

    if args.json {
        println!("{}", format_json(&summary));
    } else if !args.quiet {
        eprintln!("{}", format_text(&summary));
    }

    0
}

fn print_help() {
    println!("Batch decompiler (bulkdecomp) - Decompile every unique binary in a directory");
    println!();
    println!("USAGE:");
    println!("    bulkdecomp [OPTIONS] <DIRECTORY>");
    println!();
    println!("OPTIONS:");
    println!("    -e <EXTS>                 Comma separated extensions to match (default: .dll,.exe)");
    println!("    -o <DIR>                  Output directory (default: name of DIRECTORY)");
    println!("    -r                        Scan recursively");
    println!("    --respect-file-case       Match extensions case-sensitively");
    println!("    --allow-duplicates        Decompile files even if their content was already seen");
    println!("    --num-workers <N>         Decompilers to run concurrently (default: CPU count)");
    println!("    --no-ilspy-errors         Stop the run if the decompiler fails on a file");
    println!("    --ilspy <PATH>            Decompiler executable (default: ilspycmd on PATH)");
    println!("    --timeout <S>             Kill a decompiler that runs longer than S seconds");
    println!("    -v                        Log one line per file instead of a progress bar");
    println!("    -q, --quiet               Suppress non-error output");
    println!("    --json                    Print the run summary as JSON on stdout");
    println!("    -h, --help                Show this help message");
    println!("    --version                 Show version information");
    println!();
    println!("OUTPUT LAYOUT:");
    println!("    <OUT>/<relative path of file>/          decompiled project");
    println!("        hash.txt                            SHA-256 of the input");
    println!("        decompile-failure.log               decompiler output on failure");
    println!("        ignored.log                         first occurrence of a duplicate");
    println!();
    println!("EXAMPLES:");
    println!("    bulkdecomp -r ./game/Managed");
    println!("    bulkdecomp -e .dll -o out --num-workers 4 --no-ilspy-errors ./bin");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_DATE: &str = env!("GIT_DATE");
    const BUILD_TARGET: &str = env!("BUILD_TARGET");

    println!("bulkdecomp {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");
}
