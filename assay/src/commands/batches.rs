// assay/src/commands/batches.rs
//
// USE CASE: List the batch definitions a request resolves to.

use anyhow::Context;
use assay_core::application::DataContext;
use comfy_table::Table;
use tracing::debug;

use super::batch_request_arguments;
use crate::cli::BatchArgs;

pub fn execute(batch: BatchArgs) -> anyhow::Result<()> {
    let context = DataContext::from_project_dir(&batch.project_dir)
        .with_context(|| format!("Failed to load project at {}", batch.project_dir.display()))?;

    let arguments = batch_request_arguments(&batch)?;
    debug!(?arguments, "Listing batch definitions");
    let definitions = context.get_batch_definition_list(arguments)?;
    if definitions.is_empty() {
        println!("📭 No batch matches this request.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Batch ID", "Data Asset", "Identifiers"]);
    for definition in &definitions {
        table.add_row(vec![
            definition.id(),
            definition.data_asset_name().to_string(),
            definition.batch_identifiers().to_string(),
        ]);
    }

    println!("{}", table);
    println!("📦 {} batch(es)", definitions.len());
    Ok(())
}
