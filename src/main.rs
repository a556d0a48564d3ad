use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mailhook::cli::{Cli, Command};
use mailhook::config::Config;
use mailhook::gmail_api::GmailClient;
use mailhook::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_from_env()?;

    match cli.command {
        Command::Serve => {
            let client = GmailClient::connect(&config).await?;
            let state = AppState {
                api: Arc::new(client),
            };
            server::serve(&config, state).await?;
        }
        Command::Watch {
            user,
            topic,
            labels,
        } => {
            let labels = if labels.is_empty() {
                vec!["INBOX".to_string()]
            } else {
                labels
            };

            let client = GmailClient::connect(&config).await?;
            println!("Watching mailbox {} for topic {}", user, topic);
            let response = client.register_watch(&user, &topic, &labels).await?;
            println!("Watch registered.");
            println!("  History ID: {}", response.history_id);
            println!("  Expiration: {}", response.expiration);
        }
    }

    Ok(())
}
