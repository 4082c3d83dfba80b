use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "payg-cli", version, about = "Pay as You Go shell CLI")]
struct Cli {
    /// Log filter (e.g. "info", "payg_core=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show subscription state
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enter an unlock code
    AddCode {
        /// The numeric code
        code: String,
    },
    /// Remove the current code
    ClearCode,
    /// Follow PAYG events and reminders until interrupted
    Watch {
        /// Session mode used to decide whether reminders are shown
        #[arg(long, default_value = "user")]
        session_mode: String,
    },
    /// Format a duration the way reminders show it
    Format {
        /// Duration in seconds
        seconds: u64,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Status { json } => commands::status::run(json).await,
        Commands::AddCode { code } => commands::code::add(&code).await,
        Commands::ClearCode => commands::code::clear().await,
        Commands::Watch { session_mode } => commands::watch::run(&session_mode).await,
        Commands::Format { seconds } => commands::format::run(seconds),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
