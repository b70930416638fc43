//! Gatekeep CLI - licensed task runner
//!
//! Logs in against the licensing service, keeps the session verified while a
//! task chain runs, and checks for client updates.

mod commands;
mod config;
mod credentials;
mod demo;
mod output;
mod progress;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use credentials::JsonCredentialStore;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gatekeep - licensed task runner
#[derive(Parser)]
#[command(name = "gatekeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Client configuration file (JSON)
    #[arg(long, env = "GATEKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for saved logins, config and updates
    #[arg(long, env = "GATEKEEP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with user name and password
    Login {
        /// User name
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "GATEKEEP_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[command(flatten)]
        save: SaveFlags,
    },

    /// Log in with a single-code card
    CodeLogin {
        /// Card code
        code: String,

        #[command(flatten)]
        save: SaveFlags,
    },

    /// Register a new account
    Register {
        /// User name
        username: String,

        /// Password (prompted with confirmation when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Top up an account with a recharge card
    Recharge {
        /// User name
        username: String,

        /// Recharge card
        card: String,
    },

    /// Show the current announcement
    Announcement,

    /// Check for a newer client version
    Update {
        /// Download the update if one is available
        #[arg(short, long)]
        download: bool,
    },

    /// Log in and run the task chain under watchdog supervision
    Run(RunArgs),

    /// Forget saved login details
    Forget,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Clone, Copy)]
struct SaveFlags {
    /// Remember the password / code
    #[arg(long)]
    remember: bool,

    /// Log in automatically on `run --auto`
    #[arg(long)]
    auto_login: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Log in with the saved auto-login details
    #[arg(long, conflicts_with_all = ["user", "code"])]
    auto: bool,

    /// Log in as this user (password prompted)
    #[arg(long, conflicts_with = "code")]
    user: Option<String>,

    /// Password for --user (prompted when omitted)
    #[arg(long, requires = "user", env = "GATEKEEP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log in with a single-code card
    #[arg(long)]
    code: Option<String>,

    #[command(flatten)]
    save: SaveFlags,

    /// Run the chain once instead of looping
    #[arg(long)]
    once: bool,

    /// Number of counter steps in the chain
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..))]
    steps: u16,

    /// Delay per step in milliseconds
    #[arg(long, default_value_t = 1000)]
    step_delay_ms: u64,

    /// Stop the chain when a step fails
    #[arg(long)]
    stop_on_error: bool,

    /// Also watch for announcements
    #[arg(long)]
    announcements: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gatekeep_cli=debug,gatekeep_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        use clap::CommandFactory;
        clap_complete::generate(shell, &mut Cli::command(), "gatekeep", &mut std::io::stdout());
        return Ok(());
    }

    // Determine data directory
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    let client_config = config::load(cli.config.as_deref(), &data_dir)?;
    let store = JsonCredentialStore::in_dir(&data_dir);

    // Initialize core
    let core = gatekeep_core::GatekeepCore::new(client_config)?;

    match cli.command {
        Commands::Login {
            username,
            password,
            save,
        } => commands::login(&core, &store, &username, password, save, cli.output).await?,

        Commands::CodeLogin { code, save } => {
            commands::code_login(&core, &store, &code, save, cli.output).await?
        }

        Commands::Register { username, password } => {
            commands::register(&core, &username, password).await?
        }

        Commands::Recharge { username, card } => {
            commands::recharge(&core, &username, &card).await?
        }

        Commands::Announcement => commands::announcement(&core, cli.output).await?,

        Commands::Update { download } => commands::update(&core, download, cli.output).await?,

        Commands::Run(args) => commands::run(&core, &store, args).await?,

        Commands::Forget => commands::forget(&store)?,

        Commands::Completions { .. } => {}
    }

    Ok(())
}
