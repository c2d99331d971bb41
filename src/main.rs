//! LS-8 Emulator - CLI entry point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run an `.ls8` image (or assemble-and-run `.asm`)
//! - `ls8-emu asm <source>` - Assemble mnemonic source to an `.ls8` image
//! - `ls8-emu disasm <program>` - Disassemble an `.ls8` image

use clap::{Parser, Subcommand};
use ls8::{assemble, disassemble, load_image, save_image, Cpu, ImageError, Output};
use std::path::Path;
use std::process;

/// Unknown opcode, divide by zero, usage or parse errors.
const EXIT_FAILURE: i32 = 1;
/// The program file does not exist.
const EXIT_FILE_NOT_FOUND: i32 = 2;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the LS-8 8-bit register machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the `.ls8` image (or `.asm` source) to execute
        program: String,
        /// Maximum number of instructions to run (default: unbounded)
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print a state trace line to stderr before every instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON after the run
        #[arg(long)]
        dump_state: bool,
    },
    /// Assemble source to an `.ls8` image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file (default: source with an `.ls8` extension)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an `.ls8` image to readable text
    Disasm {
        /// Path to the image file
        program: String,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_FAILURE,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    match cli.command {
        Commands::Run {
            program,
            max_cycles,
            trace,
            dump_state,
        } => {
            run_program(&program, max_cycles, trace, dump_state);
        }
        Commands::Asm { source, output } => {
            assemble_file(&source, output);
        }
        Commands::Disasm { program } => {
            disassemble_file(&program);
        }
    }
}

/// Load the program bytes, assembling first when given `.asm` source.
fn load_program_bytes(path: &str) -> Vec<u8> {
    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("File not found");
                process::exit(EXIT_FILE_NOT_FOUND);
            }
            Err(e) => {
                eprintln!("ERROR: failed to read {}: {}", path, e);
                process::exit(EXIT_FAILURE);
            }
        };

        match assemble(&source) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(EXIT_FAILURE);
            }
        }
    } else {
        match load_image(path) {
            Ok(image) => image.bytes,
            Err(ImageError::NotFound) => {
                eprintln!("File not found");
                process::exit(EXIT_FILE_NOT_FOUND);
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(EXIT_FAILURE);
            }
        }
    }
}

fn run_program(path: &str, max_cycles: Option<u64>, trace: bool, dump_state: bool) {
    let program = load_program_bytes(path);

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(&program) {
        eprintln!("ERROR: {}", e);
        process::exit(EXIT_FAILURE);
    }

    let mut executed = 0u64;
    while cpu.is_running() {
        if let Some(limit) = max_cycles {
            if executed >= limit {
                eprintln!(
                    "⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.",
                    limit
                );
                break;
            }
        }

        if trace {
            eprintln!("{}", cpu.trace());
        }

        match cpu.step() {
            Ok(_) => {
                for out in cpu.drain_output() {
                    print_output(out);
                }
                executed += 1;
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(EXIT_FAILURE);
            }
        }
    }

    if dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(EXIT_FAILURE);
            }
        }
    }
}

/// Render one queued print event the way the machine's console does:
/// PRN as a decimal line, PRA as a code-point character line.
fn print_output(out: Output) {
    match out {
        Output::Value(v) => println!("{}", v),
        Output::Char(c) => println!("{}", char::from(c)),
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| {
        Path::new(source_path)
            .with_extension("ls8")
            .to_string_lossy()
            .into_owned()
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("File not found");
            process::exit(EXIT_FILE_NOT_FOUND);
        }
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    let bytes = match assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    if let Err(e) = save_image(&out_path, &bytes) {
        eprintln!("❌ Failed to save image: {}", e);
        process::exit(EXIT_FAILURE);
    }

    println!("✓ Saved {} bytes to {}", bytes.len(), out_path);
}

fn disassemble_file(path: &str) {
    let image = match load_image(path) {
        Ok(image) => image,
        Err(ImageError::NotFound) => {
            eprintln!("File not found");
            process::exit(EXIT_FILE_NOT_FOUND);
        }
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    print!("{}", disassemble(&image.bytes));
}
