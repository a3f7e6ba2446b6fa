use tea_project::config::TeaConfig;
use tea_project::menu::App;

use clap::Parser;
use core_logic::setup_logger;
use dotenv::dotenv;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/tea-sepolia/config.toml")]
    config: String,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();

    // Pre-pass for log_dir; a broken config is reported once the logger is up.
    let log_dir = TeaConfig::load(&args.config)
        .map(|c| c.log_dir)
        .unwrap_or_else(|_| "logs".into());
    let log_guard = setup_logger(&log_dir);

    let code = run(&args).await;

    // Flush file logs before exiting.
    drop(log_guard);
    std::process::exit(code);
}

async fn run(args: &Args) -> i32 {
    info!("Loading config from: {}", args.config);
    let config = match TeaConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return 1;
        }
    };
    info!("Configuration loaded for chain ID: {}", config.chain_id);

    let mut app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ {:#}", e);
            return 1;
        }
    };

    match app.run().await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            1
        }
    }
}
