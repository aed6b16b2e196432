//! CLI for the MPU multipart upload orchestrator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mpu_core::config;
use std::path::Path;

use commands::{run_config, run_plan, run_upload};

/// Top-level CLI for the MPU multipart upload orchestrator.
#[derive(Debug, Parser)]
#[command(name = "mpu")]
#[command(about = "MPU: concurrent multipart uploads to S3-compatible storage", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a file through the multipart API.
    Upload {
        /// Path to the local file.
        path: String,

        /// Override the configured part size in bytes.
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,

        /// Override the configured number of concurrent part transfers (hard cap 15).
        #[arg(long, value_name = "N")]
        threads: Option<usize>,

        /// Override the configured upload API base URL.
        #[arg(long, value_name = "URL")]
        api: Option<String>,
    },

    /// Show the part plan for a file without uploading anything.
    Plan {
        /// Path to the local file.
        path: String,

        /// Part size in bytes (defaults to the configured chunk_size).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },

    /// Show the resolved configuration and its file path.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                path,
                chunk_size,
                threads,
                api,
            } => run_upload(&cfg, Path::new(&path), chunk_size, threads, api).await?,
            CliCommand::Plan { path, chunk_size } => run_plan(&cfg, Path::new(&path), chunk_size)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
