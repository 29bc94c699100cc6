//! Terminal chat client for Advisor Chat.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin advisor-chat -- --user-id <id>
//! ```

use advisor_chat_client::{Args, ClientConfig};
use advisor_chat_shared::logger::setup_logger;
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match ClientConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = advisor_chat_client::run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
