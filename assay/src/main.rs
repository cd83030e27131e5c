// assay/src/main.rs

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug assay batches ... to see resolution details
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: RESOLVE REQUEST ---
        Commands::Request { batch } => commands::request::execute(batch)?,

        // --- USE CASE: LIST BATCHES ---
        Commands::Batches { batch } => commands::batches::execute(batch)?,

        // --- USE CASE: PREVIEW ROWS ---
        Commands::Head {
            batch,
            n_rows,
            fetch_all,
        } => commands::head::execute(batch, n_rows, fetch_all)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_head_defaults() {
        let args = Cli::parse_from(["assay", "head", "--datasource", "local"]);
        match args.command {
            Commands::Head {
                batch,
                n_rows,
                fetch_all,
            } => {
                assert_eq!(batch.datasource.as_deref(), Some("local"));
                assert_eq!(n_rows, 5);
                assert!(!fetch_all);
            }
            _ => panic!("Expected Head command"),
        }
    }

    #[test]
    fn test_cli_parse_batches_flags() {
        let args = Cli::parse_from([
            "assay",
            "batches",
            "--project-dir",
            "/tmp",
            "--data-connector",
            "files",
            "--limit",
            "2",
        ]);
        match args.command {
            Commands::Batches { batch } => {
                assert_eq!(batch.project_dir.to_string_lossy(), "/tmp");
                assert_eq!(batch.data_connector.as_deref(), Some("files"));
                assert_eq!(batch.limit, Some(2));
            }
            _ => panic!("Expected Batches command"),
        }
    }

    #[test]
    fn test_cli_rejects_malformed_key_value() {
        assert!(Cli::try_parse_from(["assay", "request", "--filter", "novalue"]).is_err());
    }
}
