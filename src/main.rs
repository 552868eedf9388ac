use std::sync::Arc;

use colored::Colorize;
use log::{error, info, warn};
use radiobot_impls::NodeClient;
use radiobot_radio::{DatabaseError, InputResolver, Radio, SqliteDatabase};
use settings::{Settings, SettingsError};
use thiserror::Error;
use tokio::runtime;

mod logging;
mod settings;

#[derive(Debug, Error)]
enum BotError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Control server failed: {0}")]
    Server(#[from] std::io::Error),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl BotError {
    fn hint(&self) -> String {
        match self {
            BotError::Settings(e) => e.hint(),
            BotError::Database(_) => "This is a database error. Make sure RADIOBOT_DATABASE_URL points to a writable location, then try again.".to_string(),
            BotError::Server(_) => "Make sure RADIOBOT_SERVER_PORT is free, then try again.".to_string(),
            BotError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

async fn run(settings: Settings) -> Result<(), BotError> {
    info!("Opening database...");
    let database = SqliteDatabase::new(&settings.database_url, settings.config.clone()).await?;

    let node = Arc::new(
        NodeClient::new(&settings.node_url, &settings.node_password)
            .with_ready_poll_interval(settings.config.ready_poll_interval),
    );
    let node_events = node.listen();

    let resolver = Arc::new(InputResolver::new(node.clone()));
    let radio = Arc::new(Radio::new(database, node, resolver, settings.config));

    let reconcile = radio.reconcile_loop().spawn();

    info!("Initialized successfully.");

    let result = tokio::select! {
        result = radiobot_server::run_server(radio.clone(), settings.server_port) => {
            result.map_err(BotError::from)
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Shutting down...");
            Ok(())
        }
    };

    reconcile.abort();
    node_events.abort();

    result
}

fn main() {
    logging::init_logger();

    let result = Settings::from_env().map_err(BotError::from).and_then(|settings| {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BotError::Fatal(e.to_string()))?;

        runtime.block_on(run(settings))
    });

    if let Err(error) = result {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "radiobot failed!".bold().red()
        );
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());

        std::process::exit(1);
    }
}
