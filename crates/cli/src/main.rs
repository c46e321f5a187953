//! chatforge CLI: the main entry point.
//!
//! Commands:
//! - `init`       Write a starter config and create the data directory
//! - `modifiers`  Inspect and edit the context modifier pipeline
//! - `rule`       Check a trigger rule against some text
//! - `dynprompt`  List and import dynamic prompt sets
//! - `tools`      List, enable and disable tools
//! - `assemble`   Print the prompt that would be sent for a stored chat

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "chatforge",
    about = "chatforge: prompt assembly and tool-calling generation for chat agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config and create the data directory
    Init,

    /// Manage the context modifier pipeline
    Modifiers {
        #[command(subcommand)]
        action: ModifierAction,
    },

    /// Evaluate a trigger rule against text (reads stdin without --text or --file)
    Rule {
        /// The rule, e.g. '"dragon" & !"tavern"'
        expr: String,

        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Manage dynamic prompt sets
    Dynprompt {
        #[command(subcommand)]
        action: DynPromptAction,
    },

    /// Manage the tools offered to the model
    Tools {
        #[command(subcommand)]
        action: ToolAction,
    },

    /// Assemble and print the prompt for a stored chat
    Assemble {
        #[arg(long)]
        chat: String,

        #[arg(long)]
        agent: String,

        /// Offer the enabled tools (chat mode only)
        #[arg(long)]
        tools: bool,
    },
}

#[derive(Subcommand)]
enum ModifierAction {
    /// Show the activated pipeline, in order
    List,
    /// Show every registered modifier
    Available,
    /// Append a modifier to the pipeline
    Activate {
        name: String,
        #[arg(default_value = "")]
        input: String,
    },
    /// Remove the entry at INDEX
    Remove { index: usize },
    /// Move the entry at FROM to TO
    Move { from: usize, to: usize },
    /// Flip the enabled flag of the entry at INDEX
    Toggle { index: usize },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
enum DynPromptAction {
    List,
    /// Import sets from a JSON file (one set or an array); same-named sets are replaced
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum ToolAction {
    List,
    Enable { name: String },
    Disable { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Rule { expr, text, file } => commands::rule::run(&expr, text, file)?,
        Commands::Modifiers { action } => {
            let ws = commands::Workspace::open()?;
            match action {
                ModifierAction::List => commands::modifiers::list(&ws).await?,
                ModifierAction::Available => commands::modifiers::available(&ws)?,
                ModifierAction::Activate { name, input } => commands::modifiers::activate(&ws, &name, &input).await?,
                ModifierAction::Remove { index } => commands::modifiers::remove(&ws, index).await?,
                ModifierAction::Move { from, to } => commands::modifiers::move_entry(&ws, from, to).await?,
                ModifierAction::Toggle { index } => commands::modifiers::toggle(&ws, index).await?,
                ModifierAction::Clear => commands::modifiers::clear(&ws).await?,
            }
        }
        Commands::Dynprompt { action } => {
            let ws = commands::Workspace::open()?;
            match action {
                DynPromptAction::List => commands::dynprompt::list(&ws).await?,
                DynPromptAction::Import { file } => commands::dynprompt::import(&ws, &file).await?,
            }
        }
        Commands::Tools { action } => {
            let ws = commands::Workspace::open()?;
            match action {
                ToolAction::List => commands::tools::list(&ws).await?,
                ToolAction::Enable { name } => commands::tools::enable(&ws, &name).await?,
                ToolAction::Disable { name } => commands::tools::disable(&ws, &name).await?,
            }
        }
        Commands::Assemble { chat, agent, tools } => {
            let ws = commands::Workspace::open()?;
            commands::assemble::run(&ws, &chat, &agent, tools).await?
        }
    }

    Ok(())
}
