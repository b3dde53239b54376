//! Mode/persona configuration assembler.
//!
//! Validates a tree of mode templates and persona documents and writes one
//! assembled artifact per valid mode. The run report goes to stdout; the
//! exit code says whether any error-severity issue was found.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;

use assembler::exit_codes;
use assembler::io::config::load_for_input;
use assembler::logging;
use assembler::pipeline::{RunOptions, run};

#[derive(Parser, Debug)]
#[command(
    name = "assembler",
    version,
    about = "Validate mode and persona documents and assemble per-mode artifacts"
)]
struct Cli {
    /// Input root containing the modes and personas subtrees.
    input: PathBuf,

    /// Output root for assembled artifacts.
    output: PathBuf,

    /// Config file (default: `<INPUT>/assembler.toml`, optional).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Worker threads for loading, validation and assembly.
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    format: ReportFormat,

    /// Run every stage but do not write artifacts.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Json,
    Text,
}

fn main() {
    logging::init();
    match execute(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FATAL);
        }
    }
}

fn execute(cli: Cli) -> Result<i32> {
    let mut config = load_for_input(&cli.input, cli.config.as_deref())?;
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    let jobs = config.effective_jobs();
    debug!(jobs, input = %cli.input.display(), "starting run");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(jobs)
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    let options = RunOptions {
        input: cli.input,
        output: cli.output,
        config,
        dry_run: cli.dry_run,
    };
    let outcome = runtime.block_on(run(&options))?;

    match cli.format {
        ReportFormat::Json => print!("{}", outcome.report.to_json()?),
        ReportFormat::Text => print!("{}", outcome.report.to_text()),
    }
    Ok(outcome.report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_roots_and_defaults() {
        let cli = Cli::try_parse_from(["assembler", "in", "out"]).expect("parse");
        assert_eq!(cli.input, PathBuf::from("in"));
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.format, ReportFormat::Json);
        assert_eq!(cli.jobs, None);
        assert!(!cli.dry_run);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "assembler",
            "in",
            "out",
            "--config",
            "cfg.toml",
            "--jobs",
            "3",
            "--format",
            "text",
            "--dry-run",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(cli.jobs, Some(3));
        assert_eq!(cli.format, ReportFormat::Text);
        assert!(cli.dry_run);
    }

    #[test]
    fn output_root_is_required() {
        assert!(Cli::try_parse_from(["assembler", "in"]).is_err());
    }
}
