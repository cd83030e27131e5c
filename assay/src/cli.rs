// assay/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assay")]
#[command(about = "Resolve, list and preview data batches for validation", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🧾 Resolves the flags into a batch request and prints it with its id
    Request {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// 📦 Lists the batches a request resolves to
    Batches {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// 👀 Shows the first rows of the first matching batch
    Head {
        #[command(flatten)]
        batch: BatchArgs,

        /// Number of rows to show
        #[arg(long, short = 'n', default_value_t = 5)]
        n_rows: usize,

        /// Show every row
        #[arg(long, default_value = "false")]
        fetch_all: bool,
    },
}

/// Everything a caller can say about the batch they want.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Project directory (holds assay.yaml)
    #[arg(long, default_value = ".", env = "ASSAY_PROJECT_DIR")]
    pub project_dir: PathBuf,

    #[arg(long)]
    pub datasource: Option<String>,

    #[arg(long)]
    pub data_connector: Option<String>,

    #[arg(long)]
    pub data_asset: Option<String>,

    /// SQL query producing the batch (runtime)
    #[arg(long)]
    pub query: Option<String>,

    /// File the batch is read from (runtime)
    #[arg(long)]
    pub path: Option<String>,

    /// JSON array of row objects loaded as in-memory batch data (runtime)
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,

    /// Maximum number of batches
    #[arg(long)]
    pub limit: Option<i64>,

    /// Batch index: `-1`, `0:3`, `::-1`
    #[arg(long, allow_hyphen_values = true)]
    pub index: Option<String>,

    /// Batch filter parameter (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, Value)>,

    /// Runtime batch identifier (repeatable)
    #[arg(long = "identifier", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub identifiers: Vec<(String, Value)>,

    #[arg(long)]
    pub sampling_method: Option<String>,

    #[arg(long = "sampling-kwarg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub sampling_kwargs: Vec<(String, Value)>,

    #[arg(long)]
    pub splitter_method: Option<String>,

    #[arg(long = "splitter-kwarg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub splitter_kwargs: Vec<(String, Value)>,
}

/// `key=value`; the value is read as JSON when it parses, else kept as a string.
pub fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
