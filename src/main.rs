//! # igen CLI Entry Point
//!
//! Parses arguments with clap, resolves the configuration once, and hands it
//! to the command handlers in [`igen::commands`].

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use igen::commands;
use igen::commands::cache::CacheOp;
use igen::{IgenConfig, RunFlags};

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_utf8_console() {}

#[derive(Parser)]
#[command(name = "igen")]
#[command(about = "Incremental interface generator for C/C++ projects", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project root [default: current directory]
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Project config file [default: <root>/igen.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Default)]
struct BuildArgs {
    /// Re-check and rewrite every interface
    #[arg(long)]
    force: bool,
    /// Re-check every interface; only changed ones are written
    #[arg(long)]
    check: bool,
    /// Print every extracted declaration
    #[arg(long)]
    debug: bool,
    /// Worker threads
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Compiler flags, after `--`
    #[arg(last = true)]
    flags: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate stale interfaces (the default)
    Build(BuildArgs),
    /// Show which interfaces a build would check
    Status,
    /// Inspect or reset the check cache
    Cache {
        #[command(subcommand)]
        op: CacheCommand,
    },
    /// Rebuild whenever a source or the manifest changes
    Watch(BuildArgs),
    /// Generate shell completions
    Completion { shell: Shell },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached check times
    Show,
    /// Delete the cache, forcing a full re-check
    Clear,
    /// Print the cache location
    Path,
}

impl From<&CacheCommand> for CacheOp {
    fn from(cmd: &CacheCommand) -> Self {
        match cmd {
            CacheCommand::Show => CacheOp::Show,
            CacheCommand::Clear => CacheOp::Clear,
            CacheCommand::Path => CacheOp::Path,
        }
    }
}

fn load_config(cli: &Cli) -> Result<IgenConfig> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let config = IgenConfig::load(root, cli.config.as_deref()).context("failed to load configuration")?;
    Ok(config.with_flags(RunFlags::from_env()))
}

fn build_config(cli: &Cli, args: &BuildArgs) -> Result<IgenConfig> {
    let config = load_config(cli)?;
    let flags = RunFlags::new(args.force, args.check, args.debug).union(config.flags);
    let jobs = args.jobs.unwrap_or(config.jobs);
    Ok(config
        .with_flags(flags)
        .with_jobs(jobs)
        .with_compiler_flags(&args.flags))
}

fn main() -> Result<()> {
    enable_utf8_console();

    let cli = Cli::parse();

    match &cli.command {
        None => {
            let config = build_config(&cli, &BuildArgs::default())?;
            commands::build::run(&config).map(|_| ())
        }
        Some(Commands::Build(args)) => {
            let config = build_config(&cli, args)?;
            commands::build::run(&config).map(|_| ())
        }
        Some(Commands::Status) => commands::status::run(&load_config(&cli)?),
        Some(Commands::Cache { op }) => commands::cache::run(&load_config(&cli)?, op.into()),
        Some(Commands::Watch(args)) => commands::watch::watch(&build_config(&cli, args)?),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
