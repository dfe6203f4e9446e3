use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "psyai")]
#[command(about = "PsyAI Telegram relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the relay: long-poll Telegram, answer /start and /info, forward questions to the Q&A service.
    Run {
        /// Config file path (default: PSYAI_CONFIG_PATH or ~/.psyai/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // missing .env is fine
        if !e.not_found() {
            eprintln!("warning: loading .env failed: {}", e);
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("psyai {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run { config }) => {
            if let Err(e) = run_relay(config).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_relay(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, path) = psyai::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let settings = psyai::config::Settings::from_env(&config)?;
    log::info!("starting relay (qa endpoint {})", settings.qa.base_url);
    psyai::relay::run(settings).await
}
