use alloy_kyc::cli::{self, Cli};
use alloy_kyc::client::KycClient;
use clap::Parser;

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG from it applies.
    let dotenv = dotenvy::dotenv();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // A missing .env is fine; the shell environment may already be set.
    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    let args = Cli::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };

    let client = match KycClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build client: {}", e);
            std::process::exit(2);
        }
    };

    match cli::run(&client, &args.command).await {
        Ok(evaluation) => {
            print!("{}", cli::render(&evaluation));
            if evaluation.error().is_some() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}
