// Command-line front end for keyring rewriting.
//
// `rewrite` copies a keyring into a new file, optionally versioning the
// percona_binlog key. `list` prints what a keyring holds without writing.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::io::{IoError, RewriteStats, hex_digest, inspect_file, rewrite_file};
use crate::keyring::DecodedKeyring;
use crate::rewrite::RewriteOptions;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// MySQL keyring_file reader/rewriter.
#[derive(Parser, Debug)]
#[command(
    name = "keyring-rewrite",
    version,
    about = "Rewrite MySQL keyring files, optionally versioning the percona_binlog key",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a new keyring from an existing one.
    Rewrite(RewriteArgs),
    /// Print the header and keys of a keyring.
    List(ListArgs),
}

#[derive(Args, Debug)]
struct RewriteArgs {
    /// The keyring file to read.
    #[arg(long = "input-keyring", short = 'i', value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// The new keyring file to create (must not exist).
    #[arg(long = "output-keyring", short = 'o', value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Rename the percona_binlog key to percona_binlog:0.
    #[arg(long = "fix-percona-binlog", short = 'f')]
    fix: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Keyring file to read.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Rewrite,
    List,
}

#[derive(Debug)]
struct Options {
    command: Command,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    input_file: PathBuf,
    output_file: Option<PathBuf>,
    fix: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let quiet = cli.quiet;
    let verbose = cli.verbose.min(2);
    let json_output = cli.json_output;

    match cli.command {
        Cmd::Rewrite(args) => Options {
            command: Command::Rewrite,
            quiet,
            verbose,
            json_output,
            input_file: args.input,
            output_file: Some(args.output),
            fix: args.fix,
        },
        Cmd::List(args) => Options {
            command: Command::List,
            quiet,
            verbose,
            json_output,
            input_file: args.input,
            output_file: None,
            fix: false,
        },
    }
}

/// Default log filter for the given verbosity. `RUST_LOG` takes precedence.
fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("keyring-rewrite".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Rewrite command
// ---------------------------------------------------------------------------

fn stats_json(stats: &RewriteStats, fix: bool) -> serde_json::Value {
    serde_json::json!({
        "command": "rewrite",
        "version": stats.report.version,
        "fix": fix,
        "keys": stats.report.keys,
        "renamed": stats.report.renamed,
        "unversioned": stats.report.unversioned,
        "sentinel_present": stats.report.sentinel_present,
        "input_size": stats.report.bytes_in,
        "output_size": stats.report.bytes_out,
        "input_sha256": stats.input_sha256.map(|d| hex_digest(&d)),
        "output_sha256": stats.output_sha256.map(|d| hex_digest(&d)),
    })
}

fn cmd_rewrite(opts: &Options) -> i32 {
    let Some(output) = opts.output_file.as_deref() else {
        eprintln!("keyring-rewrite: rewrite requires an output keyring");
        return 1;
    };
    let rewrite_opts = RewriteOptions::with_fix(opts.fix);

    let stats = match rewrite_file(&opts.input_file, output, &rewrite_opts) {
        Ok(stats) => stats,
        Err(e) => {
            report_error(&e);
            return 1;
        }
    };

    if opts.json_output {
        match serde_json::to_string_pretty(&stats_json(&stats, opts.fix)) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("keyring-rewrite: json: {e}");
                return 1;
            }
        }
    } else if !opts.quiet {
        eprintln!(
            "keyring-rewrite: wrote {} keys ({} renamed) to {}",
            stats.report.keys,
            stats.report.renamed,
            output.display()
        );
    }

    0
}

// ---------------------------------------------------------------------------
// List command
// ---------------------------------------------------------------------------

fn keyring_json(keyring: &DecodedKeyring) -> serde_json::Value {
    let keys: Vec<serde_json::Value> = keyring
        .keys
        .iter()
        .map(|k| {
            let owner = (!k.is_system()).then(|| String::from_utf8_lossy(k.owner_id()));
            serde_json::json!({
                "key_id": String::from_utf8_lossy(k.key_id()),
                "key_type": String::from_utf8_lossy(k.key_type()),
                "owner_id": owner,
                "payload_len": k.payload().len(),
            })
        })
        .collect();
    serde_json::json!({
        "command": "list",
        "version": keyring.header.version(),
        "keys": keys,
        "sentinel_present": keyring.has_sentinel(),
    })
}

fn cmd_list(opts: &Options) -> i32 {
    let keyring = match inspect_file(&opts.input_file) {
        Ok(k) => k,
        Err(e) => {
            report_error(&e);
            return 1;
        }
    };

    if opts.json_output {
        match serde_json::to_string_pretty(&keyring_json(&keyring)) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("keyring-rewrite: json: {e}");
                return 1;
            }
        }
        return 0;
    }

    println!("Keyring file version: {}", keyring.header.version());
    for (i, key) in keyring.keys.iter().enumerate() {
        println!("  {i:>4}  {key}, Payload: {} bytes", key.payload().len());
    }
    println!(
        "{} keys, sentinel {}",
        keyring.keys.len(),
        if keyring.has_sentinel() { "present" } else { "missing" }
    );

    0
}

fn report_error(e: &IoError) {
    eprintln!("keyring-rewrite: {e}");
    if let IoError::OutputAlreadyExists(_) = e {
        eprintln!("keyring-rewrite: choose a new output path; existing files are never replaced");
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Rewrite => cmd_rewrite(&opts),
        Command::List => cmd_list(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
