//! csync - keep MSBuild manifests in step with the files on disk

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::{cmd, config, logging, util};
use std::path::PathBuf;

/// csync - keep project manifests in sync with the working tree
#[derive(Parser)]
#[command(name = "csync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Answer yes to every prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the workspace and keep manifests in sync
    Watch {
        /// Also write logs to .csync/logs/watch.log
        #[arg(long)]
        log_file: bool,
    },
    /// Add a file, or every file below a directory, to its manifest
    Add {
        path: PathBuf,
        /// Ask before changing the manifest
        #[arg(long)]
        prompt: bool,
    },
    /// Remove a file or directory from its manifest
    Remove {
        path: PathBuf,
        /// Manifest to edit instead of the nearest one
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Do not ask for confirmation
        #[arg(long)]
        silent: bool,
    },
    /// Show whether a file is in its manifest
    Status { path: PathBuf },
    /// Manage paths csync never asks about
    #[command(subcommand)]
    Ignore(IgnoreCommands),
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum IgnoreCommands {
    /// List ignored paths
    List,
    /// Forget every ignored path
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all values
    List,
    /// Print one value
    Get { key: String },
    /// Change one value
    Set { key: String, value: String },
    /// Show the config file location
    Path {
        /// Write the defaults if the file does not exist
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example config
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config(config_cmd) = &cli.command {
        logging::init("warn", None)?;
        return match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(key, value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(*create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        };
    }

    let root = util::workspace_root(cli.root)?;
    let _guard = match &cli.command {
        Commands::Watch { log_file: true } => {
            logging::init("info", Some(&config::state_dir(&root).join("logs")))?
        }
        Commands::Watch { .. } => logging::init("info", None)?,
        _ => logging::init("warn", None)?,
    };

    match cli.command {
        Commands::Watch { .. } => cmd::watch::run(&root, cli.yes).await,
        Commands::Add { path, prompt } => cmd::add::run(&root, &path, prompt, cli.yes).await,
        Commands::Remove { path, manifest, silent } => {
            cmd::remove::run(&root, &path, manifest.as_deref(), silent, cli.yes).await
        }
        Commands::Status { path } => cmd::status::run(&root, &path).await,
        Commands::Ignore(IgnoreCommands::List) => cmd::ignore::run_list(&root).await,
        Commands::Ignore(IgnoreCommands::Clear) => cmd::ignore::run_clear(&root).await,
        Commands::Config(_) => Ok(()),
    }
}
