use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::report;

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Path to a converted `{threads, messages}` document.
    pub input: PathBuf,

    /// Emit the report as JSON instead of key=value lines.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let document = report::load_document(&args.input)?;
    let report = report::analyze(&document);

    if args.json {
        let encoded =
            serde_json::to_string_pretty(&report).context("failed to encode inspect report")?;
        println!("{encoded}");
        return Ok(());
    }

    println!(
        "inspect: totals threads={} messages={}",
        report.threads_total, report.messages_total
    );
    for (role, breakdown) in &report.role_counts {
        println!(
            "inspect: role role={} messages={} threads={}",
            role, breakdown.messages, breakdown.threads
        );
    }
    for id in &report.orphan_message_ids {
        println!("inspect: orphan_message id={id}");
    }
    for id in &report.empty_thread_ids {
        println!("inspect: empty_thread id={id}");
    }
    println!(
        "inspect: complete consistent={} orphan_messages={} empty_threads={}",
        report.is_consistent(),
        report.orphan_message_ids.len(),
        report.empty_thread_ids.len()
    );

    Ok(())
}
