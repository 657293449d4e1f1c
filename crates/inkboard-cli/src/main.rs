use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "inkboard", version, about = "Inkboard e-ink dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the device loop until Ctrl-C
    Run {
        /// Use in-memory collaborators instead of Google and sysfs
        #[arg(long)]
        mock: bool,
    },
    /// Refresh once and print all four screens
    Preview {
        /// Use in-memory collaborators instead of Google and sysfs
        #[arg(long)]
        mock: bool,
        /// Print render payloads as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run { mock } => commands::run::run(mock),
        Commands::Preview { mock, json } => commands::preview::run(mock, json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
