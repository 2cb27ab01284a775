use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "package-tool")]
#[command(version)]
#[command(about = "Compile a TypeScript project and zip it into a versioned publish archive")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Log every step to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Package <FOLDER> as-is into publish/<name>-<version>.zip
    Build(BuildArgs),
    /// Stamp a development revision and package into publish/<name>-<x_y_rev>.zip
    Publish(PublishArgs),
    /// Manage package-tool configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project folder containing src/ and package.json
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Project folder containing src/, package.json and README.md
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,
    /// Revision to stamp into the third version segment (default: generated `<n>-dev`)
    #[arg(short = 'r', long = "revision", conflicts_with = "no_increment_version")]
    pub revision: Option<String>,
    /// Keep the manifest version unchanged instead of stamping a revision
    #[arg(short = 'i', long = "no-increment-version")]
    pub no_increment_version: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a key in package-tool config (e.g. tools.tsc.path)
    Set(ConfigSetArgs),
    /// Print the config file location
    Path,
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Config key path (e.g. staging.temp_dir)
    pub key: String,
    /// Value to assign to the key (stored as a string)
    pub value: String,
    /// Override config file path (default: $XDG_CONFIG_HOME/package-tool/config.toml)
    #[arg(long = "file")]
    pub file: Option<PathBuf>,
}
