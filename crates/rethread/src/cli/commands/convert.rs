use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::convert::{OUTPUT_FILENAME, convert_bytes, encode_document};

#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    /// Path to the vendor export document.
    pub input: PathBuf,

    /// Output path; defaults to `converted_threads.json` next to the input.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Fail instead of writing an empty document when nothing survives
    /// extraction.
    #[arg(long, default_value_t = false)]
    pub fail_empty: bool,
}

pub fn run(args: &ConvertArgs) -> Result<()> {
    println!("convert: start input={}", args.input.display());

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read input file: {}", args.input.display()))?;
    let conversion = convert_bytes(&bytes)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    for warning in &conversion.warnings {
        println!("convert: warning detail={warning}");
    }

    if args.fail_empty && conversion.document.is_empty() {
        bail!(
            "no valid conversations found in {} ({} seen, {} skipped)",
            args.input.display(),
            conversion.stats.conversations_seen,
            conversion.stats.conversations_skipped
        );
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_file_name(OUTPUT_FILENAME));
    let encoded = encode_document(&conversion.document)?;
    std::fs::write(&output, encoded)
        .with_context(|| format!("failed to write converted document: {}", output.display()))?;

    println!(
        "convert: complete threads={} messages={} conversations_seen={} conversations_skipped={} duplicates={} messages_rejected={} warnings={} input_bytes={} elapsed_ms={}",
        conversion.stats.threads_emitted,
        conversion.stats.messages_emitted,
        conversion.stats.conversations_seen,
        conversion.stats.conversations_skipped,
        conversion.stats.duplicate_conversations,
        conversion.stats.messages_rejected,
        conversion.stats.warnings,
        conversion.stats.input_bytes,
        conversion.stats.elapsed_ms,
    );
    println!("convert: output {}", output.display());
    println!("convert: next `rethread inspect {}`", output.display());

    Ok(())
}
