//! whatevers CLI: insert, get, exists, list, update and delete whatevers.
//! Config from env (.env supported) and optional CLI args.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use whatevers_core::init_tracing;
use whatevers_storage::{CancellationToken, DbContext, EntityRepository};

use whatevers_cli::{execute, load_config, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.database_url)?;
    init_tracing(config.log_file.as_deref())?;

    let context = DbContext::connect(&config.storage)
        .await
        .with_context(|| format!("Connect to {}", config.storage.database_url))?;
    let context = Arc::new(context);
    let repo = EntityRepository::new(Arc::clone(&context));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted; cancelling");
                cancel.cancel();
            }
        });
    }

    let result = execute(cli.command, &repo, &cancel).await;
    context.close().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
