//! Headless CLI for the vn1801 machine.
//!
//! Loads an assembly source file, runs it to completion (or to an `IN` stall,
//! which it resolves from stdin), and prints any terminal output. Argument
//! parsing is hand-rolled, matching `emu-amiga::main`'s style rather than
//! pulling in a CLI-parsing crate for four flags.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use vn1801_core::engine::{Mode, StepOutcome};
use vn1801_sim::{Demo, Driver, EngineConfig, NoOpAdapter};

struct CliArgs {
    rom_path: Option<PathBuf>,
    trace: bool,
    paragraph_demo: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs { rom_path: None, trace: false, paragraph_demo: false };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rom" => {
                i += 1;
                cli.rom_path = args.get(i).map(PathBuf::from);
            }
            "--trace" => cli.trace = true,
            "--paragraph-demo" => cli.paragraph_demo = true,
            "--help" | "-h" => {
                eprintln!("Usage: vn1801-sim --rom <file> [--trace] [--paragraph-demo]");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    let cli = parse_args();

    let Some(rom_path) = cli.rom_path else {
        eprintln!("No ROM specified. Use --rom <file>");
        process::exit(1);
    };

    let source = match std::fs::read_to_string(&rom_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", rom_path.display());
            process::exit(1);
        }
    };

    let mut config = EngineConfig::empty();
    if cli.paragraph_demo {
        config.demos.push(Demo::ParagraphSearch {
            text: vn1801_sim::demos::DEFAULT_PARAGRAPH,
            search_word: vn1801_sim::demos::DEFAULT_SEARCH_WORD,
        });
    }

    let mut driver = Driver::new(NoOpAdapter, &config);

    match driver.load_rom(&source) {
        Ok(warnings) => {
            for w in &warnings {
                eprintln!("warning: {w}");
            }
        }
        Err(e) => {
            eprintln!("Failed to assemble {}: {e}", rom_path.display());
            process::exit(1);
        }
    }

    loop {
        let outcome = driver.execute(Mode::Direct);
        match outcome {
            StepOutcome::WaitingForInput => {
                print!("? ");
                io::stdout().flush().ok();
                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                driver.feed_input(line.trim_end_matches('\n'));
                driver.interrupt(vn1801_sim::Interrupt::Io);
            }
            StepOutcome::Idle => break,
            StepOutcome::ReturnedToBootloader => {
                if cli.trace {
                    eprintln!("program halted, control returned to boot");
                }
                break;
            }
            StepOutcome::MicroStepped | StepOutcome::InstructionComplete => unreachable!(
                "Mode::Direct only returns on a suspending outcome (StepOutcome::suspends)"
            ),
        }
    }

    driver.shutdown();
}
