//! Command execution: maps each [`Commands`] variant onto one repository call and renders
//! the result as JSON.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use uuid::Uuid;
use whatevers_core::{Entity, Whatever};
use whatevers_storage::{CancellationToken, EntityRepository, Repository, WriteOutcome};

use crate::cli::Commands;

/// Runs `command` and returns the JSON document to print.
pub async fn execute(
    command: Commands,
    repo: &EntityRepository<Whatever>,
    cancel: &CancellationToken,
) -> Result<Value> {
    match command {
        Commands::Insert {
            name,
            description,
            id,
        } => {
            let whatever = match id {
                Some(id) => Whatever::with_id(id, name, description)?,
                None => Whatever::new(name, description)?,
            };
            let outcome = repo
                .insert(&whatever, cancel)
                .await
                .context("Insert whatever")?;
            Ok(json!({ "outcome": outcome_label(outcome), "whatever": whatever }))
        }
        Commands::Get { id } => {
            let found = repo
                .select_by_id(id, cancel)
                .await
                .context("Select whatever")?;
            Ok(serde_json::to_value(found)?)
        }
        Commands::Exists { id } => {
            let exists = repo.exists(id, cancel).await.context("Check whatever")?;
            Ok(json!({ "id": id, "exists": exists }))
        }
        Commands::List {
            name,
            limit,
            offset,
        } => {
            let mut query = repo.select_all();
            if let Some(name) = name {
                query = query.filter_eq("name", name);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(offset) = offset {
                query = query.offset(offset);
            }
            let all = query.fetch_all().await.context("List whatevers")?;
            Ok(serde_json::to_value(all)?)
        }
        Commands::Update {
            id,
            name,
            description,
        } => update(repo, id, name, description, cancel).await,
        Commands::Delete { id } => {
            repo.delete(id, cancel).await.context("Delete whatever")?;
            Ok(json!({ "deleted": id }))
        }
    }
}

async fn update(
    repo: &EntityRepository<Whatever>,
    id: Uuid,
    name: Option<String>,
    description: Option<String>,
    cancel: &CancellationToken,
) -> Result<Value> {
    let Some(mut whatever) = repo
        .select_by_id(id, cancel)
        .await
        .context("Select whatever")?
    else {
        return Ok(json!({ "outcome": outcome_label(WriteOutcome::SkippedNotFound), "id": id }));
    };

    if let Some(name) = name {
        whatever.rename(name)?;
    }
    if description.is_some() {
        whatever.describe(description);
    }

    let outcome = repo
        .update(&whatever, cancel)
        .await
        .context("Update whatever")?;
    Ok(json!({ "outcome": outcome_label(outcome), "id": whatever.id(), "whatever": whatever }))
}

fn outcome_label(outcome: WriteOutcome) -> &'static str {
    match outcome {
        WriteOutcome::Applied => "applied",
        WriteOutcome::SkippedAlreadyExists => "skipped_already_exists",
        WriteOutcome::SkippedNotFound => "skipped_not_found",
    }
}
