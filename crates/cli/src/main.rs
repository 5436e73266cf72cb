//! Pipeline simulator CLI.
//!
//! This binary is a thin front end over `pipesim_core`. It provides:
//! 1. **Run:** Assemble a program file and run it on a preset or a JSON configuration.
//! 2. **Config:** Print a preset as JSON, as a starting point for a custom configuration.
//!
//! Logging goes through `tracing`; set `RUST_LOG` (or pass `--trace`) for more detail.

use std::fmt::Write as _;
use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipesim_core::common::{RegisterId, SimError};
use pipesim_core::config::{Config, Variant};
use pipesim_core::isa::abi::parse_register;
use pipesim_core::sim::RunReport;
use pipesim_core::{Simulator, assemble};

#[derive(Parser, Debug)]
#[command(
    name = "pipesim",
    author,
    version,
    about = "Cycle-accurate pipeline simulator",
    long_about = "Assemble a program and run it on one of the machine presets.\n\nExamples:\n  pipesim run prime.s\n  pipesim run prime.s --variant superscalar --stats summary,pipeline\n  pipesim run counters.s --variant multi-core --cores 4 --dump 0x400:16\n  pipesim config --variant cached > cached.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble and run a program file.
    Run {
        /// Assembly source file.
        file: String,

        /// Machine preset (scalar, pipelined, cached, predicted, superscalar, multi-core).
        #[arg(short, long, default_value = "superscalar", value_parser = parse_variant)]
        variant: Variant,

        /// JSON configuration file; replaces the preset.
        #[arg(short, long)]
        config: Option<String>,

        /// Number of cores.
        #[arg(long)]
        cores: Option<usize>,

        /// Initial register value, e.g. `a0=1109` (repeatable).
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(RegisterId, i32)>,

        /// Memory range to print after the run, e.g. `0x100:16` (repeatable).
        #[arg(long = "dump", value_parser = parse_range)]
        dump: Vec<(u32, u32)>,

        /// Comma-separated statistics sections to print (empty for all).
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        stats: Option<Vec<String>>,

        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Emit per-stage pipeline events.
        #[arg(long)]
        trace: bool,

        /// Abort after this many cycles.
        #[arg(long)]
        max_cycles: Option<u64>,
    },

    /// Print a preset configuration as JSON.
    Config {
        /// Machine preset.
        #[arg(short, long, default_value = "superscalar", value_parser = parse_variant)]
        variant: Variant,
    },
}

fn parse_variant(name: &str) -> Result<Variant, String> {
    Variant::from_name(name).ok_or_else(|| {
        let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
        format!("unknown variant `{name}` (expected one of: {})", names.join(", "))
    })
}

fn parse_number(text: &str) -> Result<i64, String> {
    let (neg, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse(),
    }
    .map_err(|e| format!("invalid number `{text}`: {e}"))?;
    Ok(if neg { -value } else { value })
}

fn parse_assignment(text: &str) -> Result<(RegisterId, i32), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected `reg=value`, found `{text}`"))?;
    let reg = parse_register(name.trim()).ok_or_else(|| format!("unknown register `{name}`"))?;
    let value = parse_number(value.trim())?;
    let value = i32::try_from(value)
        .or_else(|_| u32::try_from(value).map(|v| v as i32))
        .map_err(|_| format!("value {value} does not fit in 32 bits"))?;
    Ok((reg, value))
}

fn parse_range(text: &str) -> Result<(u32, u32), String> {
    let (addr, len) = text
        .split_once(':')
        .ok_or_else(|| format!("expected `addr:len`, found `{text}`"))?;
    let addr = u32::try_from(parse_number(addr.trim())?).map_err(|e| e.to_string())?;
    let len = u32::try_from(parse_number(len.trim())?).map_err(|e| e.to_string())?;
    Ok((addr, len))
}

/// Formats `bytes` as rows of 16, each prefixed with its address.
fn hex_dump(base: u32, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:#010x}:", base as usize + row * 16);
        for b in chunk {
            let _ = write!(out, " {b:02x}");
        }
        out.push('\n');
    }
    out
}

fn init_tracing(trace: bool) {
    let default = if trace { "pipesim_core=trace" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct RunArgs {
    file: String,
    variant: Variant,
    config: Option<String>,
    cores: Option<usize>,
    set: Vec<(RegisterId, i32)>,
    dump: Vec<(u32, u32)>,
    stats: Option<Vec<String>>,
    json: bool,
    trace: bool,
    max_cycles: Option<u64>,
}

fn load_config(args: &RunArgs) -> Result<Config, SimError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| SimError::Config(format!("cannot read {path}: {e}")))?;
            Config::from_json(&text)?
        }
        None => Config::for_variant(args.variant),
    };
    if let Some(cores) = args.cores {
        config.system.cores = cores;
        if cores > 1 && !config.cache.l1_d.enabled {
            info!("enabling the data caches required by multi-core runs");
            config.cache.l1_d.enabled = true;
            config.cache.shared.enabled = true;
        }
    }
    if let Some(max) = args.max_cycles {
        config.general.max_cycles = max;
    }
    config.general.trace |= args.trace;
    Ok(config)
}

fn print_text(report: &RunReport, sim: &Simulator, args: &RunArgs) {
    println!(
        "{}: {} instructions in {} cycles on {} core(s)",
        args.file,
        report.stats.instructions_retired,
        report.cycles,
        report.per_core.len()
    );
    for (core, regs) in (0..report.per_core.len()).filter_map(|c| sim.registers(c).map(|r| (c, r))) {
        let nonzero: Vec<String> = regs
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| format!("x{i}={v}"))
            .collect();
        println!("core {core}: {}", nonzero.join(" "));
    }
    for &(addr, len) in &args.dump {
        let start = addr as usize;
        let end = start.saturating_add(len as usize).min(sim.memory().len());
        print!("{}", hex_dump(addr, sim.memory().get(start..end).unwrap_or(&[])));
    }
    if let Some(sections) = &args.stats {
        report.stats.print_sections(sections);
    }
}

fn print_json(report: &RunReport, sim: &Simulator, args: &RunArgs) -> Result<(), SimError> {
    let registers: Vec<[i32; 32]> = (0..report.per_core.len())
        .filter_map(|c| sim.registers(c))
        .collect();
    let dumps: Vec<_> = args
        .dump
        .iter()
        .map(|&(addr, len)| {
            let start = addr as usize;
            let end = start.saturating_add(len as usize).min(sim.memory().len());
            json!({ "addr": addr, "bytes": sim.memory().get(start..end).unwrap_or(&[]) })
        })
        .collect();
    let value = json!({
        "cycles": report.cycles,
        "stats": report.stats,
        "per_core": report.per_core,
        "registers": registers,
        "dump": dumps,
    });
    let text = serde_json::to_string_pretty(&value).map_err(|e| SimError::Config(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn cmd_run(args: &RunArgs) -> Result<(), SimError> {
    let config = load_config(args)?;
    let source = fs::read_to_string(&args.file)
        .map_err(|e| SimError::Config(format!("cannot read {}: {e}", args.file)))?;
    let program = assemble(&source)?;
    info!(file = %args.file, instructions = program.len(), "assembled");

    let mut sim = Simulator::new(config)?;
    for &(reg, value) in &args.set {
        sim.set_register(reg, value);
    }
    let report = sim.run(&program)?;
    if args.json {
        print_json(&report, &sim, args)
    } else {
        print_text(&report, &sim, args);
        Ok(())
    }
}

fn cmd_config(variant: Variant) -> Result<(), SimError> {
    let text = serde_json::to_string_pretty(&Config::for_variant(variant))
        .map_err(|e| SimError::Config(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            file,
            variant,
            config,
            cores,
            set,
            dump,
            stats,
            json,
            trace,
            max_cycles,
        } => {
            init_tracing(trace);
            cmd_run(&RunArgs {
                file,
                variant,
                config,
                cores,
                set,
                dump,
                stats,
                json,
                trace,
                max_cycles,
            })
        }
        Commands::Config { variant } => cmd_config(variant),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assignments_accept_abi_and_hex() {
        assert_eq!(parse_assignment("a0=1109"), Ok((RegisterId::A0, 1109)));
        assert_eq!(parse_assignment("x11=-0x10"), Ok((RegisterId::A1, -16)));
        assert_eq!(parse_assignment("a0=0xFFFFFFFF"), Ok((RegisterId::A0, -1)));
        assert!(parse_assignment("q7=1").is_err());
        assert!(parse_assignment("a0").is_err());
    }

    #[test]
    fn ranges_parse() {
        assert_eq!(parse_range("0x100:16"), Ok((0x100, 16)));
        assert!(parse_range("0x100").is_err());
        assert!(parse_range("-1:4").is_err());
    }

    #[test]
    fn variants_parse_by_name() {
        assert_eq!(parse_variant("multi-core"), Ok(Variant::MultiCore));
        assert!(parse_variant("vliw").unwrap_err().contains("superscalar"));
    }

    #[test]
    fn dump_rows_are_sixteen_bytes() {
        let bytes: Vec<u8> = (0..20).collect();
        let text = hex_dump(0x100, &bytes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0x00000100: 00 01"));
        assert_eq!(lines[1], "0x00000110: 10 11 12 13");
    }
}
