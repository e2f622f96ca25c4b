mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daybook::config::DaybookConfig;

#[derive(Parser)]
#[command(name = "daybook", version, about = "Journal memory and proactive check-ins over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Search an actor's memories
    Recall {
        /// Free-text query; empty recalls everything
        #[arg(default_value = "")]
        query: String,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Proactive check-ins
    Checkins {
        #[command(subcommand)]
        action: CheckinsAction,
    },
    /// Show recent audit events
    Audit {
        #[arg(long)]
        actor: Option<String>,
        /// Filter by entity, e.g. CheckInSuggestion
        #[arg(long)]
        entity_type: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show memory statistics
    Stats {
        #[arg(long)]
        actor: Option<String>,
    },
    /// Check database health
    Doctor,
    /// Forget all memories for an actor
    Reset {
        #[arg(long)]
        actor: Option<String>,
    },
}

#[derive(Subcommand)]
enum CheckinsAction {
    /// Run the daily scheduler for every opted-in user
    Run {
        /// Evaluate as of this RFC3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
    },
    /// List active suggestions
    List {
        #[arg(long)]
        actor: Option<String>,
    },
}

fn init_tracing(config: &DaybookConfig) {
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.server.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DaybookConfig::load()?;
    init_tracing(&config);

    let default_actor = config.storage.default_actor.clone();
    let actor = |requested: Option<String>| requested.unwrap_or_else(|| default_actor.clone());

    match cli.command {
        Command::Serve => {
            server::serve_stdio(config).await?;
        }
        Command::Recall { query, actor: who } => {
            cli::recall::recall(&config, &actor(who), &query)?;
        }
        Command::Checkins { action } => match action {
            CheckinsAction::Run { at } => cli::checkins::run(&config, at.as_deref())?,
            CheckinsAction::List { actor: who } => cli::checkins::list(&config, &actor(who))?,
        },
        Command::Audit {
            actor: who,
            entity_type,
            limit,
        } => {
            cli::audit::audit(&config, &actor(who), entity_type.as_deref(), limit)?;
        }
        Command::Stats { actor: who } => {
            cli::stats::stats(&config, &actor(who))?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
        Command::Reset { actor: who } => {
            cli::reset::reset(&config, &actor(who))?;
        }
    }

    Ok(())
}
