use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use checky::client::{ClientConfig, RetryPolicy, api::DEFAULT_API_URL};
use checky::ui::Filter;

mod cmd;

#[derive(Parser)]
#[command(name = "checky")]
#[command(version, about = "Todo list service and terminal client")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs as JSON lines
    #[arg(long, global = true, env = "CHECKY_LOG_JSON")]
    pub log_json: bool,

    /// Base URL of the todo API
    #[arg(long, global = true, env = "CHECKY_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    pub timeout: u64,

    /// Retries for transient failures (linear backoff of 1s per attempt)
    #[arg(long, global = true, env = "CHECKY_RETRIES", default_value = "3")]
    pub retries: u32,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            retry: RetryPolicy {
                max_retries: self.retries,
                ..RetryPolicy::default()
            },
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the todo API server
    Serve(cmd::serve::ServeArgs),
    /// Open the interactive todo list
    App {
        /// Refetch in the background every N seconds
        #[arg(long, value_name = "SECS")]
        poll: Option<u64>,

        /// Initial filter: all, active or completed
        #[arg(long, default_value = "all")]
        filter: Filter,
    },
    /// Print the todo list
    List {
        /// Show all, active or completed todos
        #[arg(long, default_value = "all")]
        filter: Filter,

        /// Only todos whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Print the visible todos as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a todo
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Change a todo's title or description
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        /// New description (an empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Mark a todo completed, or reopen it
    Toggle { id: String },
    /// Delete a todo
    Remove {
        id: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Check that the todo API is reachable
    Health,
}

fn init_tracing(verbose: bool, json: bool, default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { default_level };
        EnvFilter::new(format!("checky={}", level))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let default_level = match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    init_tracing(cli.verbose, cli.log_json, default_level);

    let client = cli.client_config();
    match &cli.command {
        Commands::Serve(args) => cmd::cmd_serve(args).await?,
        Commands::App { poll, filter } => cmd::cmd_app(client, *poll, *filter).await?,
        Commands::List {
            filter,
            search,
            json,
        } => cmd::cmd_list(client, *filter, search.as_deref(), *json).await?,
        Commands::Add { title, description } => {
            cmd::cmd_add(client, title, description.as_deref()).await?
        }
        Commands::Edit {
            id,
            title,
            description,
        } => cmd::cmd_edit(client, id, title.as_deref(), description.as_deref()).await?,
        Commands::Toggle { id } => cmd::cmd_toggle(client, id).await?,
        Commands::Remove { id, force } => cmd::cmd_remove(client, id, *force).await?,
        Commands::Health => cmd::cmd_health(client).await?,
    }

    Ok(())
}
