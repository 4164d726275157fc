use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use focusloop_core::AppConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod notifier;

#[derive(Parser)]
#[command(name = "focusloop", version, about = "focusloop Pomodoro timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Project management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Timer durations and auto-start behavior
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Session statistics
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Install the stderr log subscriber.
///
/// `FOCUSLOOP_LOG` wins; otherwise the configured `log.level`. Invalid
/// filters fall back to `warn` so a bad setting never blocks the CLI.
fn init_tracing(config: &AppConfig) {
    let filter = std::env::var("FOCUSLOOP_LOG")
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .or_else(|| EnvFilter::try_new(&config.log.level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "focusloop", &mut std::io::stdout());
        return;
    }

    let config = AppConfig::load_or_default();
    init_tracing(&config);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action, &config),
        Commands::Task { action } => commands::task::run(action),
        Commands::Project { action } => commands::project::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
