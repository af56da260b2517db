//! # AAS EventFlow CLI
//!
//! Command-line utilities for compacting and inspecting recorded event
//! streams offline.

use aas_eventflow_core::{ChangeEnvelope, EventCompactor, MatchPolicy};
use anyhow::{Context, Result};
use std::env;
use std::io::{BufRead, BufReader, Read};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "compact" => {
            let policy = match args.get(3).map(String::as_str) {
                None | Some("relaxed") => MatchPolicy::Relaxed,
                Some("exact") => MatchPolicy::Exact,
                Some(other) => {
                    eprintln!("Unknown match policy: {other}");
                    std::process::exit(1);
                }
            };

            let reader: Box<dyn Read> = match args.get(2).map(String::as_str) {
                None | Some("-") => Box::new(std::io::stdin()),
                Some(path) => Box::new(
                    std::fs::File::open(path).with_context(|| format!("Failed to open {path}"))?,
                ),
            };

            let compacted = compact_stream(reader, policy)?;
            serde_json::to_writer_pretty(std::io::stdout(), &compacted)
                .context("Failed to write result")?;
            println!();
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Read newline-delimited JSON envelopes and run one compaction pass.
fn compact_stream(reader: impl Read, policy: MatchPolicy) -> Result<Vec<ChangeEnvelope>> {
    let mut compactor = EventCompactor::new(policy);

    for (number, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let envelope: ChangeEnvelope = serde_json::from_str(line)
            .with_context(|| format!("Malformed envelope on line {}", number + 1))?;
        compactor.push(envelope);
    }

    Ok(compactor.flush())
}

fn print_help() {
    println!(
        r#"AAS EventFlow CLI

USAGE:
    aas-eventflow <COMMAND> [OPTIONS]

COMMANDS:
    compact [FILE] [POLICY]  Compact newline-delimited JSON envelopes from
                             FILE (or stdin with "-") and print the reduced
                             batch as a JSON array. POLICY is "relaxed"
                             (default) or "exact".
    help                     Show this help message

EXAMPLES:
    aas-eventflow compact events.ndjson
    cat events.ndjson | aas-eventflow compact - exact
"#
    );
}
