// assay/src/commands/request.rs
//
// USE CASE: Show how loose flags resolve into a typed batch request.

use anyhow::Context;
use assay_core::domain::batch::get_batch_request_from_acceptable_arguments;

use super::batch_request_arguments;
use crate::cli::BatchArgs;

pub fn execute(batch: BatchArgs) -> anyhow::Result<()> {
    let request = get_batch_request_from_acceptable_arguments(batch_request_arguments(&batch)?)
        .context("Could not build a batch request from the given flags")?;

    let kind = if request.is_runtime() {
        "RuntimeBatchRequest"
    } else {
        "BatchRequest"
    };
    println!("🧾 {}", kind);
    println!("{}", request);
    println!("🔑 id: {}", request.id());
    Ok(())
}
