use clap::{ArgAction, Parser, Subcommand};
use commands::{auth, config, interactive, library, search};
use library_sync_config::{CardDensity, PosterSize};
use library_sync_models::WatchStatus;
use std::process::ExitCode;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "cinemora")]
#[command(about = "Cinemora - keep track of the movies and series you want to watch")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, sign up or inspect the current session
    Auth {
        #[command(subcommand)]
        cmd: AuthCommands,
    },
    /// Search movies and series
    #[command(long_about = "Search TMDB for movies and series. Queries must be between 2 and 50 characters; at most 8 results are shown.")]
    Search {
        /// Title to look for
        query: String,
    },
    /// View and edit your library
    Library {
        #[command(subcommand)]
        cmd: LibraryCommands,
    },
    /// Menu-driven session over a single library store
    #[command(long_about = "Start an interactive session. The library is loaded once and every change is shown immediately, then confirmed or rolled back when the server answers. Logs go to the log file instead of the terminal.")]
    Interactive,
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Sign in with email and password
    SignIn {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    SignUp {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored session
    SignOut,
    /// Show who is signed in
    Status,
}

#[derive(Subcommand)]
pub enum LibraryCommands {
    /// Show the library board, grouped by status
    List {
        /// Only show one column (to_watch, watching, watched, on_hold)
        #[arg(long)]
        status: Option<WatchStatus>,
    },
    /// Search for a title and add it
    Add {
        /// Title to search for
        query: String,

        /// Pick the Nth search result instead of choosing interactively
        #[arg(long, value_name = "N")]
        pick: Option<usize>,

        /// Initial status
        #[arg(long, default_value_t = WatchStatus::ToWatch)]
        status: WatchStatus,
    },
    /// Move an item to another status column
    Move {
        /// Item id, e.g. movie-603
        item_id: String,
        status: WatchStatus,
    },
    /// Set your personal rating (0-10)
    Rate {
        item_id: String,
        rating: f64,
    },
    /// Attach a note to an item
    Note {
        item_id: String,
        text: String,
    },
    /// Remove an item
    Remove {
        item_id: String,
    },
    /// Remove every item in your library
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a configuration template
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Print the config, credentials and log file locations
    Path,
    /// Change how the library board is displayed
    Dashboard {
        /// compact, normal or spacious
        #[arg(long)]
        density: Option<CardDensity>,

        /// small, medium or large
        #[arg(long)]
        poster_size: Option<PosterSize>,

        /// Restore the default display preferences
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["density", "poster_size"])]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The interactive menu owns the terminal, so its logs go to a file
    let log_file = match cli.command {
        Commands::Interactive => Some(library_sync_config::PathManager::default().log_file()),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    let result = match cli.command {
        Commands::Auth { cmd } => match cmd {
            AuthCommands::SignIn { email } => auth::sign_in(email, &output).await,
            AuthCommands::SignUp { email } => auth::sign_up(email, &output).await,
            AuthCommands::SignOut => auth::sign_out(&output).await,
            AuthCommands::Status => auth::status(&output).await,
        },
        Commands::Search { query } => search::run_search(&query, &output).await,
        Commands::Library { cmd } => library::run_library(cmd, &output).await,
        Commands::Interactive => interactive::run_interactive(&output).await,
        Commands::Config { cmd } => config::run_config(cmd.unwrap_or(ConfigCommands::Show { full: false }), &output),
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // Printed once by the store's notifier; only the status is left
        Err(e) if e.downcast_ref::<library::AlreadyReported>().is_some() => Ok(ExitCode::FAILURE),
        Err(e) => Err(e),
    }
}
