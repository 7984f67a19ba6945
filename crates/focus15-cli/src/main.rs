use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod terminal;

#[derive(Parser)]
#[command(name = "focus15", version, about = "Fifteen minutes, hands off. Grow the penguin.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive focus timer
    Run,
    /// Show growth level and session counters
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear level, wins and fails
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Recent session outcomes
    History {
        /// Number of sessions to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    logging::init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run => commands::session::run(),
        Commands::Status { json } => commands::status::run(json),
        Commands::Reset { yes } => commands::reset::run(yes),
        Commands::History { limit } => commands::history::run(limit),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
