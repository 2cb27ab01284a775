mod cmd;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use package_tool::PackageError;
use package_tool::cli::{Cli, Command};
use package_tool::compiler::TscCompiler;
use package_tool::config;
use package_tool::pipeline::{self, PipelineOptions, Variant};
use tracing::Level;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build(args) => package(config_path, args.folder, Variant::Base, None, false),
        Command::Publish(args) => package(
            config_path,
            args.folder,
            Variant::Revisioned,
            args.revision,
            !args.no_increment_version,
        ),
        Command::Config(config_cmd) => cmd::config::run(config_cmd),
    }
}

fn package(
    config_path: Option<&Path>,
    folder: PathBuf,
    variant: Variant,
    revision: Option<String>,
    stamp_revision: bool,
) -> Result<()> {
    let config = config::load(config_path)?;
    let compiler = TscCompiler::locate(config.tools.tsc.path.as_deref(), &folder)?;

    let mut options = PipelineOptions::new(folder, variant, config.temp_root());
    options.revision = revision;
    options.stamp_revision = stamp_revision;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(pipeline::run(&options, Arc::new(compiler)))?;

    println!(
        "✓ Packaged {}@{} at {}",
        report.name,
        report.version,
        report.archive.display()
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Compiler failures keep the compiler's exit code; everything else exits 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PackageError>()
        .map(PackageError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
