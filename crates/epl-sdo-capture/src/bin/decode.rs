// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! epl-sdo-decode - Decode SDO and PDO traffic from a POWERLINK capture.
//!
//! Usage:
//!   epl-sdo-decode --input cycle.pcap
//!   epl-sdo-decode --input cycle.pcap --dictionary cn1.yaml --dictionary mn.yaml
//!   epl-sdo-decode --input frames.jsonl --json --show-duplicates

use anyhow::Context;
use clap::Parser;
use epl_sdo::{Decoder, DecoderConfig, DecoderStats, DictionarySet};
use epl_sdo_capture::{load_config, load_dictionaries, read_capture, FrameRecord};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "epl-sdo-decode")]
#[command(about = "Decode POWERLINK SDO transfers and PDO payloads from a capture")]
#[command(version)]
struct Args {
    /// Input capture (.pcap or .jsonl)
    #[arg(short, long)]
    input: PathBuf,

    /// Object dictionary description (YAML or JSON), repeatable
    #[arg(short, long)]
    dictionary: Vec<PathBuf>,

    /// Decoder configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decode the command layer of duplicated frames
    #[arg(long)]
    show_duplicates: bool,

    /// Attach mapping provenance to PDO fields
    #[arg(long)]
    pdo_meta: bool,

    /// Ignore PDO mappings declared in dictionaries
    #[arg(long)]
    no_profile_mappings: bool,

    /// Frame gap inside which a repeated sequence tuple is a duplicate
    #[arg(long)]
    duplicate_window: Option<u32>,

    /// Emit one JSON report per frame instead of text
    #[arg(long)]
    json: bool,

    /// Write the extracted POWERLINK frames as JSON lines and exit
    #[arg(long)]
    export_frames: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (reports only, no summary)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// File configuration with environment and command line overrides.
    fn decoder_config(&self) -> anyhow::Result<DecoderConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => DecoderConfig::default(),
        }
        .with_env_overrides();

        if let Some(window) = self.duplicate_window {
            config = config.with_duplicate_window(window);
        }
        if self.show_duplicates {
            config = config.with_show_duplicates(true);
        }
        if self.pdo_meta {
            config = config.with_pdo_meta_info(true);
        }
        if self.no_profile_mappings {
            config = config.with_profile_mappings(false);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Reports go to stdout, logs to stderr
    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let frames = read_capture(&args.input)
        .with_context(|| format!("Failed to read capture {}", args.input.display()))?;

    if let Some(path) = &args.export_frames {
        export_frames(path, &frames)?;
        if !args.quiet {
            info!("Exported {} frames to {}", frames.len(), path.display());
        }
        return Ok(());
    }

    let config = args.decoder_config()?;
    let dictionaries = if args.dictionary.is_empty() {
        DictionarySet::new()
    } else {
        load_dictionaries(&args.dictionary).context("Failed to load dictionaries")?
    };

    if !args.quiet {
        info!("epl-sdo-decode v{}", env!("CARGO_PKG_VERSION"));
        info!("Input: {} ({} POWERLINK frames)", args.input.display(), frames.len());
        info!("Dictionaries: {}", dictionaries.len());
        info!(
            "Duplicate window: {} frames, profile mappings: {}",
            config.duplicate_window,
            if config.read_profile_mappings { "on" } else { "off" }
        );
    }

    let decoder = Decoder::new(config).with_dictionaries(dictionaries);
    let start = Instant::now();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for frame in &frames {
        let report = decoder.decode(frame);
        if !report.is_powerlink() {
            continue;
        }
        if args.json {
            serde_json::to_writer(&mut out, &*report)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", report)?;
        }
    }
    out.flush()?;

    if !args.quiet {
        print_summary(&decoder.stats(), start.elapsed().as_secs_f64());
    }

    Ok(())
}

fn export_frames(path: &Path, frames: &[epl_sdo::Frame]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for frame in frames {
        serde_json::to_writer(&mut out, &FrameRecord::from(frame))?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn print_summary(stats: &DecoderStats, elapsed_secs: f64) {
    info!("Decode complete");
    info!("  Frames: {}", stats.frames);
    info!("  SDO frames: {}", stats.sdo_frames);
    info!("  Duplicates: {}", stats.duplicates);
    info!("  Transfers reassembled: {}", stats.reassembled);
    info!("  Conversations: {} ({} cut-overs)", stats.conversations, stats.cut_overs);
    if stats.restarts > 0 {
        warn!("  Reassembly restarts: {}", stats.restarts);
    }
    if stats.diagnostics > 0 {
        warn!("  Diagnostics: {}", stats.diagnostics);
    }
    if elapsed_secs > 0.0 {
        info!("  Throughput: {:.0} frames/s", stats.frames as f64 / elapsed_secs);
    }
}
