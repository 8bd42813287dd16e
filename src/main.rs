use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use wt::commands::*;
use wt::core::{
    cache::CacheStore,
    config::WtConfig,
    error::{Result, WtError},
    print_error, print_info,
};

#[derive(Parser)]
#[command(name = "wt")]
#[command(about = "Stable IDs and self-healing for git worktrees")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Directory to scan for worktrees (defaults to the configured scan_dir, then cwd)
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the worktree cache against the disk and git, optionally repairing it
    Doctor {
        /// Apply every available fix
        #[arg(long, conflicts_with = "reset")]
        fix: bool,
        /// Discard the cache and rebuild it from disk, renumbering IDs from 1
        #[arg(long)]
        reset: bool,
    },
    /// List tracked worktrees with their IDs
    List,
}

fn open_store(dir: Option<PathBuf>) -> Result<(CacheStore, PathBuf)> {
    let config = WtConfig::load()?;
    let scan_dir = config.resolve_scan_dir(dir)?;
    let store = CacheStore::for_scan_dir(
        &scan_dir,
        Duration::from_secs(config.lock_timeout_secs),
    )?;
    log::debug!(
        "Scan directory {}, cache {}",
        scan_dir.display(),
        store.cache_file().display()
    );
    Ok((store, scan_dir))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let (store, scan_dir) = match open_store(cli.dir) {
        Ok(opened) => opened,
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Doctor { fix, reset } => {
            let result = if reset {
                execute_reset(&store, &scan_dir).map(|_| ())
            } else {
                execute_doctor(&store, &scan_dir, fix)
            };
            if let Err(e) = result {
                if let WtError::UnresolvedIssues { .. } = e {
                    print_info(&e.to_string());
                } else {
                    print_error(&e.to_string());
                }
                std::process::exit(1);
            }
        }
        Commands::List => {
            if let Err(e) = execute_list(&store, &scan_dir) {
                print_error(&e.to_string());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
