// assay/src/commands/mod.rs

pub mod batches;
pub mod head;
pub mod request;

use anyhow::Context;
use assay_core::domain::batch::{BatchDataHandle, BatchRequestArguments, RecordSet};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::cli::BatchArgs;

fn to_map(pairs: &[(String, Value)]) -> Option<Map<String, Value>> {
    if pairs.is_empty() {
        return None;
    }
    Some(pairs.iter().cloned().collect())
}

fn load_records(path: &Path) -> anyhow::Result<BatchDataHandle> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    let records: Vec<Map<String, Value>> = serde_json::from_str(&text)
        .with_context(|| format!("{} must hold a JSON array of objects", path.display()))?;
    Ok(RecordSet::from_records(&records).into_handle())
}

/// Flags map one-to-one onto the loose arguments the core normalizes.
pub fn batch_request_arguments(args: &BatchArgs) -> anyhow::Result<BatchRequestArguments> {
    let index = args.index.as_ref().map(|raw| {
        raw.trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.clone()))
    });

    let batch_data = args.records.as_deref().map(load_records).transpose()?;

    Ok(BatchRequestArguments {
        datasource_name: args.datasource.clone(),
        data_connector_name: args.data_connector.clone(),
        data_asset_name: args.data_asset.clone(),
        batch_data,
        query: args.query.clone(),
        path: args.path.clone(),
        batch_identifiers: to_map(&args.identifiers),
        batch_filter_parameters: to_map(&args.filters),
        limit: args.limit,
        index,
        sampling_method: args.sampling_method.clone(),
        sampling_kwargs: to_map(&args.sampling_kwargs),
        splitter_method: args.splitter_method.clone(),
        splitter_kwargs: to_map(&args.splitter_kwargs),
        ..BatchRequestArguments::default()
    })
}
