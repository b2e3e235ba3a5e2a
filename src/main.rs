use log::{debug, info};
use std::env;
use std::fs;
use std::io::{self, Write};
use udvm::trace::LogTrace;
use udvm::{DecompressRequest, Decompressor, Program, UdvmConfig};

fn print_usage(program: &str) {
    println!("udvm - Universal Decompressor Virtual Machine (RFC 3320 SigComp)");
    println!();
    println!(
        "Usage: {} <bytecode_file> <message_file> [--destination N] [--config FILE] [--trace]",
        program
    );
    println!();
    println!("  --destination N  4-bit destination field (1-15); code loads at (N + 1) * 64");
    println!("                   (default 1, i.e. address 0x80)");
    println!("  --config FILE    TOML configuration (cycles_per_bit, dictionary_dir, ...)");
    println!("  --trace          log every executed instruction (set RUST_LOG=trace)");
    println!();
    println!("The decompressed message is written to stdout. On failure the exit status");
    println!("is the RFC 3320 failure code.");
}

/// argv[0], or "udvm" when the platform passes no arguments at all
fn program_name(args: &[String]) -> &str {
    args.first().map_or("udvm", String::as_str)
}

fn read_file(path: &str, what: &str) -> Vec<u8> {
    match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: Cannot read {} '{}': {}", what, path, e);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let name = program_name(&args);

    // No arguments: print help and exit successfully
    if args.len() < 3 {
        print_usage(name);
        return Ok(());
    }

    let bytecode_path = &args[1];
    let message_path = &args[2];

    let mut destination_field: u8 = 1;
    let mut config_path: Option<String> = None;
    let mut trace = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--destination" if i + 1 < args.len() => {
                destination_field = args[i + 1]
                    .parse()
                    .map_err(|_| format!("Invalid destination field: {}", args[i + 1]))?;
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--trace" => {
                trace = true;
                i += 1;
            }
            other => {
                eprintln!("Error: Unexpected argument: {}", other);
                print_usage(name);
                std::process::exit(1);
            }
        }
    }

    let config = match config_path {
        Some(path) => {
            debug!("Loading configuration from {}", path);
            UdvmConfig::load(&path)?
        }
        None => UdvmConfig::default(),
    };

    let code = read_file(bytecode_path, "bytecode file");
    let message = read_file(message_path, "message file");
    let program = Program::from_destination_field(code, destination_field)
        .map_err(|e| format!("Invalid destination field {}: {}", destination_field, e))?;

    let decompressor = Decompressor::new(config)?;
    let request = DecompressRequest::new(program, message);
    let result = if trace {
        decompressor.decompress_traced(&request, &mut LogTrace)
    } else {
        decompressor.decompress(&request)
    };

    match result {
        Ok(outcome) => {
            info!(
                "Decompressed {} bytes in {} cycles, {} states created",
                outcome.output.len(),
                outcome.cycles_used,
                outcome.created_states.len()
            );
            let mut stdout = io::stdout();
            stdout.write_all(&outcome.output)?;
            stdout.flush()?;
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(opcode) = e.opcode {
                eprintln!("  failing opcode: {}", opcode);
            }
            eprintln!("  pc: 0x{:04x}", e.pc);
            eprintln!("  failure code: {}", e.code());
            if !e.partial_output.is_empty() {
                eprintln!("  {} bytes produced before the failure", e.partial_output.len());
            }
            std::process::exit(e.code() as i32);
        }
    }
}
