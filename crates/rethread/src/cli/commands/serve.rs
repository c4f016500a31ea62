use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::server::{ServerConfig, run_server};

const DEFAULT_MAX_INPUT_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind the conversion API on.
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub bind: String,

    /// Ceiling on concurrent conversions; excess load is rejected, not
    /// queued.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,

    /// Wall-clock budget for one conversion, in seconds.
    #[arg(long, default_value_t = 60)]
    pub deadline_secs: u64,

    /// Ceiling on input size in bytes, enforced before conversion starts.
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_BYTES)]
    pub max_input_bytes: usize,

    /// Directory for in-flight chunked uploads; defaults to a
    /// `rethread-uploads` directory under the system temp dir.
    #[arg(long, value_name = "PATH")]
    pub spool_dir: Option<PathBuf>,
}

pub fn run(args: &ServeArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig {
        bind: args.bind.clone(),
        max_concurrency: args.max_concurrency.max(1),
        deadline: Duration::from_secs(args.deadline_secs.max(1)),
        max_input_bytes: args.max_input_bytes,
        spool_dir: args
            .spool_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("rethread-uploads")),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_server(config))
}
