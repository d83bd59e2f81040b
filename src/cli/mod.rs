pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Trellis - stacked branches for GitHub")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize repository for Trellis
    Init {
        /// Branch the stack is layered on (defaults to the current branch)
        #[arg(long)]
        source_branch: Option<String>,

        /// Name of the first stack
        #[arg(long)]
        name: Option<String>,

        /// Force initialization even if already initialized
        #[arg(long)]
        force: bool,
    },

    /// Track a branch in the active stack
    Track {
        /// Branch to track
        branch: String,

        /// Parent branch in the stack (defaults to a new root branch)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Stop tracking a branch
    Untrack {
        /// Branch to remove from the stack
        branch: String,
    },

    /// Show the stack status tree
    Status {
        /// Include pull request status
        #[arg(long)]
        prs: bool,
    },

    /// Replay source-branch changes down the stack
    Update {
        /// Rebase instead of merge
        #[arg(long)]
        rebase: bool,
    },

    /// Push new and ahead branches to the remote
    Push {
        /// Branches per push operation
        #[arg(long)]
        batch_size: Option<usize>,

        /// Force-push with lease (required after a rebase)
        #[arg(long)]
        force_with_lease: bool,
    },

    /// Pull branches that are behind their remote
    Pull,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.setup_logging();

        match self.command {
            Commands::Init {
                source_branch,
                name,
                force,
            } => commands::init::run(source_branch, name, force),
            Commands::Track { branch, parent } => commands::stack::run_track(branch, parent),
            Commands::Untrack { branch } => commands::stack::run_untrack(branch),
            Commands::Status { prs } => commands::status::run(prs).await,
            Commands::Update { rebase } => commands::update::run(rebase).await,
            Commands::Push {
                batch_size,
                force_with_lease,
            } => commands::sync::run_push(batch_size, force_with_lease).await,
            Commands::Pull => commands::sync::run_pull().await,
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time();

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}
