use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagprint_config::PrintScript;
use tagprint_core::bus::SystemBus;
use tagprint_core::metrics::{MetricsReport, PrintMetrics};
use tagprint_core::peripherals::print_monitor::PrintMonitor;
use tagprint_core::snapshot::BufferSnapshot;
use tagprint_core::{encoder, DebugBuffer};
use tracing::{error, info};

const MONITOR_NAME: &str = "print";

#[derive(Parser, Debug)]
#[command(author, version, about = "TagPrint Monitor - replays firmware print statements", long_about = None)]
struct Args {
    /// Path to the print script (YAML)
    #[arg(short, long)]
    script: PathBuf,

    /// Firmware ELF used to locate the debug buffer symbol
    #[arg(short, long)]
    elf: Option<PathBuf>,

    /// Debug buffer address (decimal or 0x-prefixed hex), overrides the script and ELF
    #[arg(long, value_parser = parse_addr)]
    base: Option<u64>,

    /// Log file prefix; the node id is appended
    #[arg(long)]
    log_file: Option<String>,

    /// Do not echo monitor output to stdout
    #[arg(long)]
    no_echo: bool,

    /// Write a JSON result to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug tracing
    #[arg(short, long)]
    trace: bool,
}

#[derive(Serialize, Debug)]
struct RunResult {
    status: &'static str,
    script_hash: String,
    base: u64,
    prints: usize,
    failed_statements: Vec<usize>,
    lines: Vec<String>,
    metrics: MetricsReport,
    buffer: BufferSnapshot,
}

fn parse_addr(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn hash_file(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read script for hashing: {:?}", path))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Base address: command line, then script, then ELF symbol, then SRAM start.
fn resolve_base(args: &Args, script: &PrintScript) -> anyhow::Result<u64> {
    if let Some(base) = args.base {
        return Ok(base);
    }
    if let Some(base) = script.monitor.base {
        return Ok(base);
    }
    if let Some(elf) = &args.elf {
        info!("Looking up '{}' in {:?}", script.monitor.variable_name, elf);
        let symbol = tagprint_loader::find_symbol(elf, &script.monitor.variable_name)?
            .with_context(|| {
                format!(
                    "Symbol '{}' not found in {:?}",
                    script.monitor.variable_name, elf
                )
            })?;
        return Ok(symbol.data_address());
    }
    info!("No buffer address given, using SRAM base");
    Ok(script.sram.base)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries monitor output only
    let level = if args.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting TagPrint Monitor");

    info!("Loading print script: {:?}", args.script);
    let script = PrintScript::from_file(&args.script)?;
    let script_hash = hash_file(&args.script)?;

    let base = resolve_base(&args, &script)?;
    tagprint_config::check_buffer_fits(base, script.sram.base, script.sram_size()?)?;
    info!("Watching debug buffer at {:#x}", base);

    let mut bus = SystemBus::from_config(&script)?;
    // --log-file replaces the script's prefix; only one log is ever created
    let mut monitor_config = script.monitor.clone();
    if let Some(prefix) = &args.log_file {
        monitor_config.log_file = Some(prefix.clone());
    }
    let mut monitor = PrintMonitor::from_config(&monitor_config, base).with_echo(!args.no_echo);
    let metrics = Arc::new(PrintMetrics::new());
    monitor.add_observer(metrics.clone());
    bus.insert_watch(MONITOR_NAME, base, Box::new(monitor));

    let mut buf = DebugBuffer::new();
    let mut failed_statements = Vec::new();
    for (idx, statement) in script.statements.iter().enumerate() {
        if let Err(e) = encoder::encode(&mut buf, statement) {
            error!("Statement {} not printed: {}", idx, e);
            failed_statements.push(idx);
            continue;
        }
        buf.publish(&mut bus, base)
            .with_context(|| format!("Failed to publish statement {}", idx))?;
    }

    let monitor = bus
        .watch::<PrintMonitor>(MONITOR_NAME)
        .context("Print monitor missing from bus")?;
    let metrics = metrics.report();
    info!(
        "Replayed {} statements: {} prints, {} payload bytes",
        script.statements.len(),
        metrics.prints,
        metrics.payload_bytes
    );

    let result = RunResult {
        status: if failed_statements.is_empty() {
            "pass"
        } else {
            "fail"
        },
        script_hash,
        base,
        prints: monitor.records().len(),
        failed_statements: failed_statements.clone(),
        lines: monitor.lines(),
        metrics,
        buffer: BufferSnapshot::from(&buf),
    };

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write result to {:?}", path))?;
        info!("Result written to {:?}", path);
    }

    if !failed_statements.is_empty() {
        anyhow::bail!(
            "{} statement(s) could not be printed: {:?}",
            failed_statements.len(),
            failed_statements
        );
    }

    Ok(())
}
