// packages/recorder/src/main.rs
//! events-lint
//!
//! Validates builtin event definition files the way the recorder would
//! register them, and prints the resulting definitions per category.

use anyhow::{anyhow, bail, Context, Result};
use event_telemetry::observability::init_tracing;
use event_telemetry::{EventRecorder, RecorderConfig, TelemetryError};
use std::path::{Path, PathBuf};
use tracing::{error, info};

const USAGE: &str = "usage: events-lint [--config <file>] <events.yaml>...";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    files: Vec<PathBuf>,
    help: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--config requires a path to a configuration file"))?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "-h" | "--help" => parsed.help = true,
                other if other.starts_with('-') => bail!("unknown argument: {other}\n{USAGE}"),
                _ => parsed.files.push(PathBuf::from(arg)),
            }
        }

        if !parsed.help && parsed.files.is_empty() {
            bail!(USAGE);
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    init_tracing().context("failed to initialize tracing")?;

    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = RecorderConfig::load(args.config.as_deref())?;
    info!("events-lint v{} ({:?})", event_telemetry::VERSION, config);

    let mut failures = 0;
    for file in &args.files {
        failures += lint_file(&config, file)?;
    }

    if failures > 0 {
        bail!("{} event definition(s) rejected", failures);
    }
    Ok(())
}

/// Register one file into a fresh recorder; returns the number of rejections
fn lint_file(config: &RecorderConfig, path: &Path) -> Result<usize> {
    let recorder = EventRecorder::new(config.clone());
    recorder.initialize(true, true);

    let rejected = match recorder.register_builtin_file(path) {
        Ok(accepted) => {
            info!("{}: {} definitions accepted", path.display(), accepted);
            0
        }
        Err(TelemetryError::SchemaRejected { accepted, errors }) => {
            info!("{}: {} definitions accepted", path.display(), accepted);
            for e in &errors {
                error!("{}: {}", path.display(), e);
            }
            errors.len()
        }
        Err(e) => return Err(e).with_context(|| format!("registering {}", path.display())),
    };

    for def in recorder.definitions()? {
        println!(
            "{}\t{:?}\textra={}\texpiry={:?}",
            def.identity,
            def.dataset,
            def.extra_keys.join(","),
            def.expiry
        );
    }

    Ok(rejected)
}
