use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "focusday", version, about = "Pomodoro planner around one Most Important Task a day")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Run focus and break sessions
    Focus {
        #[command(subcommand)]
        action: commands::focus::FocusAction,
    },
    /// Daily review and statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Timer and break preferences
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Application configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Clear today's plan or wipe all data
    Reset {
        #[command(subcommand)]
        action: commands::reset::ResetAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    common::init_logging();

    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Focus { action } => commands::focus::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Reset { action } => commands::reset::run(action),
        Commands::Completions { shell } => {
            commands::completions::<Cli>(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
