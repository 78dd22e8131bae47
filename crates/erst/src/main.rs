use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use erst_core::prelude::*;
use erst_utils::{info, init_logging, LogFormat, LogLevel, LoggingConfig};

/// Explain smart-contract trap addresses in source terms.
#[derive(Parser, Debug)]
#[command(name = "erst")]
#[command(version)]
#[command(about = "Inspect the DWARF debug information of a compiled contract module", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log format: pretty or json (overrides ERST_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Show the container format and the debug sections found
    Info
    {
        /// Path to the module (WASM, ELF, Mach-O or PE)
        module: PathBuf,
    },
    /// List every function recorded in the debug information
    Functions
    {
        /// Path to the module
        module: PathBuf,
        /// Demangle Rust symbol names
        #[arg(long, default_value_t = false)]
        demangle: bool,
    },
    /// Explain an instruction address: function, source line and live variables
    Explain
    {
        /// Path to the module
        module: PathBuf,
        /// Instruction address (hex format: 0x1000 or decimal)
        #[arg(value_parser = parse_address)]
        address: u64,
        /// Return address of the frame, passed through to the output
        #[arg(long, value_parser = parse_address, default_value = "0")]
        return_address: u64,
        /// Frame pointer of the frame, passed through to the output
        #[arg(long, value_parser = parse_address, default_value = "0")]
        frame_pointer: u64,
        /// Demangle Rust symbol names
        #[arg(long, default_value_t = false)]
        demangle: bool,
    },
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match logging_config(&cli).and_then(|config| init_logging(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn logging_config(cli: &Cli) -> Result<LoggingConfig, erst_utils::LoggingError>
{
    let mut config = LoggingConfig::from_env()?;
    if let Some(level) = cli.log_level {
        config = config.with_level(level);
    }
    if let Some(format) = cli.log_format {
        config = config.with_format(format);
    }
    Ok(config)
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    match cli.command {
        Commands::Info { module } => {
            let Some(debug_info) = load(&module, false)? else {
                return Ok(());
            };
            print_module_info(&debug_info);
        }
        Commands::Functions { module, demangle } => {
            let Some(debug_info) = load(&module, demangle)? else {
                return Ok(());
            };
            for function in debug_info.list_subprograms() {
                println!(
                    "{:#010x}..{:#010x}  {}",
                    function.low_pc,
                    function.high_pc,
                    function.display_name()
                );
            }
        }
        Commands::Explain {
            module,
            address,
            return_address,
            frame_pointer,
            demangle,
        } => {
            let Some(debug_info) = load(&module, demangle)? else {
                return Ok(());
            };
            let frame = debug_info.explain(address, return_address, frame_pointer)?;
            print_frame(&frame);
        }
    }
    Ok(())
}

/// Read and decode `path`. A module without debug information is not an
/// error: it is reported and `None` is returned.
fn load(path: &Path, demangle: bool) -> Result<Option<DebugInfo>, Box<dyn std::error::Error>>
{
    info!(module = %path.display(), "loading module");
    let bytes = std::fs::read(path)?;

    let mut config = DebugInfoConfig::default();
    if demangle {
        config = config.with_demangler(rust_demangle);
    }

    match DebugInfo::parse_with_config(bytes, config) {
        Ok(debug_info) => Ok(Some(debug_info)),
        Err(err) if err.is_degraded() => {
            println!("no debug information available");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn print_module_info(debug_info: &DebugInfo)
{
    println!("Module Information:");
    println!("  Format: {}", debug_info.binary_type());
    println!("  Compilation Units: {}", debug_info.units().len());
    println!("  Debug Entries: {}", debug_info.nodes().len());
    println!("  Functions: {}", debug_info.list_subprograms().len());
    println!("  Sections:");
    let sections = debug_info.sections();
    for name in sections.names() {
        if let Some(range) = sections.get(name) {
            println!("    {name:<20} {:>8} bytes", range.len());
        }
    }
}

fn print_frame(frame: &Frame)
{
    println!("Frame at {:#x}:", frame.address);
    println!("  Function: {}", frame.function);
    match &frame.source_location {
        Some(location) => println!("  Source: {location}"),
        None => println!("  Source: <unknown>"),
    }
    println!("  Return Address: {:#x}", frame.return_address);
    println!("  Frame Pointer: {:#x}", frame.frame_pointer);

    if frame.local_variables.is_empty() {
        println!("  Locals: none");
        return;
    }
    println!("  Locals:");
    for var in &frame.local_variables {
        let location = if var.location.is_empty() { "-" } else { var.location.as_str() };
        println!("    {} {}: {} @ {}", var.kind, var.demangled_name, var.type_name, location);
    }
}

/// Parse `0x`-prefixed hex or plain decimal.
fn parse_address(input: &str) -> Result<u64, String>
{
    let trimmed = input.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{input}': {e}"))
}
