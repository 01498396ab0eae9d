mod app;
mod commands;
mod events;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use finhot::config::{self, ClientConfig};
use finhot::{Confirmation, SourceType};

use app::App;
use commands::{handle_command, FeedCommands};

#[derive(Parser, Debug)]
#[command(name = "finhot")]
#[command(about = "Terminal client for monitoring hot financial news events", long_about = None)]
struct Args {
    /// Backend API URL
    #[arg(long, env = "FINHOT_API_URL", default_value = config::DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Feed auto-refresh interval in seconds
    #[arg(long, default_value_t = config::DEFAULT_REFRESH_SECS, global = true)]
    refresh: u64,

    /// Health poll interval in seconds
    #[arg(long, default_value_t = config::DEFAULT_HEALTH_SECS, global = true)]
    health_interval: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Language for event details and drafts (e.g. "en", "ru")
    #[arg(long, env = "FINHOT_LANG", global = true)]
    lang: Option<String>,

    /// Directory for bookmarks and logs
    #[arg(long, env = "FINHOT_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Start the dashboard with auto-refresh turned off
    #[arg(long, global = true)]
    no_auto_refresh: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch interactive TUI dashboard
    #[command(name = "dashboard", alias = "tui")]
    Dashboard,

    /// List events matching the given filters
    #[command(name = "list")]
    List {
        /// Headline search text
        #[arg(short, long, default_value = "")]
        query: String,
        /// Minimum hotness in [0, 1]
        #[arg(long, default_value_t = 0.0)]
        min_hotness: f64,
        /// Confirmation filter: any, true or false
        #[arg(long, default_value = "any")]
        confirmed: Confirmation,
        /// Comma-separated source types
        #[arg(long, value_delimiter = ',')]
        types: Vec<SourceType>,
        /// Maximum number of events
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
        /// Only show bookmarked events
        #[arg(long)]
        starred: bool,
        /// Event type as classified by the service (e.g. "earnings")
        #[arg(long)]
        event_type: Option<String>,
        /// Expected price impact
        #[arg(long, value_parser = ["pos", "neg", "uncertain"])]
        impact_side: Option<String>,
        /// Minimum AI materiality score in [0, 1]
        #[arg(long, default_value_t = 0.0)]
        min_materiality: f64,
    },

    /// Show one event in detail
    #[command(name = "show")]
    Show {
        /// Event ID
        id: String,
    },

    /// Generate a draft for an event and print it
    #[command(name = "generate")]
    Generate {
        /// Event ID
        id: String,
    },

    /// Print the existing draft of an event as text
    #[command(name = "export")]
    Export {
        /// Event ID
        id: String,
    },

    /// Toggle the bookmark on an event
    #[command(name = "star")]
    Star {
        /// Event ID
        id: String,
    },

    /// List bookmarked event IDs
    #[command(name = "stars")]
    Stars,

    /// Show service health
    #[command(name = "health")]
    Health,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            timeout_secs: self.timeout,
            refresh_interval: Duration::from_secs(self.refresh),
            health_interval: Duration::from_secs(self.health_interval),
            lang: self.lang.clone(),
            data_dir: self.data_dir.clone().unwrap_or_else(config::default_data_dir),
            auto_refresh: !self.no_auto_refresh,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.client_config();

    let command = match args.command {
        // Dashboard/TUI mode (default)
        Some(Commands::Dashboard) | None => {
            init_tracing(Some(&config.log_file()))?;
            return run_tui(config).await;
        }
        Some(Commands::List {
            query,
            min_hotness,
            confirmed,
            types,
            limit,
            starred,
            event_type,
            impact_side,
            min_materiality,
        }) => FeedCommands::List {
            query,
            min_hotness,
            confirmed,
            types,
            limit,
            starred,
            event_type,
            impact_side,
            min_materiality,
        },
        Some(Commands::Show { id }) => FeedCommands::Show { id },
        Some(Commands::Generate { id }) => FeedCommands::Generate { id },
        Some(Commands::Export { id }) => FeedCommands::Export { id },
        Some(Commands::Star { id }) => FeedCommands::Star { id },
        Some(Commands::Stars) => FeedCommands::Stars,
        Some(Commands::Health) => FeedCommands::Health,
    };

    init_tracing(None)?;
    handle_command(command, &config).await
}

/// Log to stderr, or to `log_file` when the terminal belongs to the dashboard.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("finhot=info,finhot_cli=info"));

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }

    Ok(())
}

async fn run_tui(config: ClientConfig) -> Result<()> {
    // Build the app before touching the terminal so setup errors print normally
    let mut app = App::new(&config).await?;

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
