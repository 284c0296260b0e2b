//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rowcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, default_value = "info", help = "Log filter when RUST_LOG is unset")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "check", about = "Validate a config file and print the effective settings")]
    Check(ConfigArgs),

    #[command(name = "ping", about = "Check that the cache store and database are reachable")]
    Ping(ConfigArgs),

    #[command(name = "inspect", about = "Show the raw cache entry for a key")]
    Inspect(InspectArgs),

    #[command(name = "invalidate", about = "Delete cache keys")]
    Invalidate(InvalidateArgs),
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[arg(short, long, default_value = "rowcache.toml", help = "Path to the TOML config file")]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[arg(help = "Cache key to inspect")]
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct InvalidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[arg(required = true, help = "Cache keys to delete")]
    pub keys: Vec<String>,

    #[arg(short = 'y', long, help = "Skip the confirmation prompt")]
    pub yes: bool,
}

mod check;
mod inspect;
mod invalidate;
mod ping;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_logging(&cli.log);

    match &cli.command {
        Commands::Check(args) => check::execute(args),
        Commands::Ping(args) => ping::execute(args).await,
        Commands::Inspect(args) => inspect::execute(args).await,
        Commands::Invalidate(args) => invalidate::execute(args).await,
    }
}
