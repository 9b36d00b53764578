use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "homework", version, about = "Homework checklist with offline-first sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a homework item
    Add {
        /// Item title
        title: String,
    },
    /// List homework items
    List {
        /// Print the collection as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an item done, or not done again
    Toggle {
        /// Item ID (a unique prefix is enough)
        id: String,
    },
    /// Remove an item (local only)
    Remove {
        /// Item ID (a unique prefix is enough)
        id: String,
    },
    /// Reconcile local items with the remote table
    Sync,
    /// Account sign-in state
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HOMEWORK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Add { title } => commands::items::add(&title).await,
        Commands::List { json } => commands::items::list(json).await,
        Commands::Toggle { id } => commands::items::toggle(&id).await,
        Commands::Remove { id } => commands::items::remove(&id).await,
        Commands::Sync => commands::sync::run().await,
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
