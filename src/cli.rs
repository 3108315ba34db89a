use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge files, services, packages and agent routing to their declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Agent configuration file (default: <config dir>/config.toml)
    #[arg(long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make the host match the declared resources
    Apply(ApplyArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Show candidate handlers and which one is selected on this host
    Handlers,

    /// Upload to or fetch from the content store
    #[command(subcommand)]
    Store(StoreCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconciliation Commands
// ============================================================================

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// JSON file with resource descriptors
    pub descriptors: PathBuf,

    /// Dry run - compute changes without applying them
    #[arg(short, long)]
    pub dry_run: bool,

    /// Number of resources reconciled in parallel (default from config)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only reconcile `kind` or `kind:id` (e.g. `service:nginx`)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// JSON file with resource descriptors
    pub descriptors: PathBuf,

    /// Only show `kind` or `kind:id`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip text diffs of file content
    #[arg(long)]
    pub no_content: bool,
}

// ============================================================================
// Store Commands
// ============================================================================

#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    /// Upload a file and print its content hash
    Put {
        /// File to upload
        path: PathBuf,
    },

    /// Fetch an object by hash
    Get {
        /// SHA-1 content hash
        hash: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
