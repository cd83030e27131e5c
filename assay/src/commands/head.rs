// assay/src/commands/head.rs
//
// USE CASE: Preview the first rows of a resolved batch.

use anyhow::Context;
use assay_core::application::DataContext;
use comfy_table::Table;
use serde_json::Value;
use tracing::debug;

use super::batch_request_arguments;
use crate::cli::BatchArgs;

pub fn execute(batch: BatchArgs, n_rows: usize, fetch_all: bool) -> anyhow::Result<()> {
    let context = DataContext::from_project_dir(&batch.project_dir)
        .with_context(|| format!("Failed to load project at {}", batch.project_dir.display()))?;

    let batches = context.get_batch_list(batch_request_arguments(&batch)?)?;
    let Some(first) = batches.first() else {
        anyhow::bail!("📭 No batch matches this request.");
    };

    debug!(batches = batches.len(), "Previewing first batch");
    let rows = first.head(context.execution_engine(), n_rows, fetch_all)?;
    let rows = rows.as_array().cloned().unwrap_or_default();

    println!(
        "👀 Batch {} ({} row(s) loaded)",
        first.id().unwrap_or_default(),
        first
            .batch_markers()
            .get("row_count")
            .map(Value::to_string)
            .unwrap_or_else(|| "?".to_string())
    );

    let columns: Vec<String> = rows
        .first()
        .and_then(Value::as_object)
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();

    let mut table = Table::new();
    table.set_header(columns.clone());
    for row in &rows {
        table.add_row(
            columns
                .iter()
                .map(|c| match row.get(c) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                })
                .collect::<Vec<_>>(),
        );
    }
    println!("{}", table);
    Ok(())
}
