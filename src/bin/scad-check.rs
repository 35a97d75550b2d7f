//! `scad-check`: report syntax errors in `OpenSCAD` files.
//!
//! Runs the same parser the library exposes and renders each diagnostic
//! with its source snippet. Exits with status 1 if any file has errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use miette::{IntoDiagnostic, NamedSource, Report, Result, WrapErr};
use openscad_syntax::{ParseOptions, parse_with};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Check `OpenSCAD` source files for syntax errors
#[derive(Debug, Parser)]
#[command(name = "scad-check", version, about, long_about = None)]
struct Cli {
    /// Files to check
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Maximum nesting depth before the parser gives up on a construct
    #[arg(long, default_value_t = openscad_syntax::parser::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Only print the summary line
    #[arg(short, long)]
    quiet: bool,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

const fn directive_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "openscad_syntax=debug,scad_check=debug",
        _ => "openscad_syntax=trace,scad_check=trace",
    }
}

/// Diagnostics found in one file.
fn check_file(path: &Path, options: &ParseOptions, quiet: bool) -> Result<usize> {
    let bytes = std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let source = String::from_utf8_lossy(&bytes).into_owned();
    let result = parse_with(&source, options);
    debug!(
        file = %path.display(),
        diagnostics = result.diagnostics().len(),
        "checked file"
    );

    if !quiet {
        let name = path.display().to_string();
        for diagnostic in result.diagnostics() {
            let report = Report::new(diagnostic.clone())
                .with_source_code(NamedSource::new(&name, source.clone()));
            eprintln!("{report:?}");
        }
    }
    Ok(result.diagnostics().len())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))?;

    let options = ParseOptions::default().with_max_depth(cli.max_depth);
    let mut total = 0;
    let mut failed_files = 0;
    for path in &cli.files {
        let count = check_file(path, &options, cli.quiet)?;
        if count > 0 {
            failed_files += 1;
        }
        total += count;
    }

    info!(files = cli.files.len(), diagnostics = total, "done");
    println!(
        "{} file(s) checked, {failed_files} with errors, {total} diagnostic(s)",
        cli.files.len()
    );
    Ok(if total > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
