//! Smoke-test runner: loads a raw core image and runs it to a software HLT.
//!
//! The image is a flat sequence of little-endian 16-bit words, one per PDP-8
//! memory cell (only the low 12 bits of each are used), loaded starting at
//! field 0 address 0. Execution starts at 0o0200, the conventional origin
//! for PDP-8 test and diagnostic binaries.
//!
//! Download a diagnostic such as MAINDEC-8E-D0AB (Instruction Test 1) and
//! assemble it to this format, or write a small program of your own.

use pdp8::{Config, Cpu, HaltReason, Leds, RunOutcome, Switches};
use std::fs;

const START_ADDRESS: u16 = 0o0200;
const STUCK_THRESHOLD: u32 = 3;

fn main() {
    let image_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "test-roms/pdp8_diag.bin".to_string());

    let raw = match fs::read(&image_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load core image '{image_path}': {e}");
            eprintln!();
            eprintln!("Usage: pdp8smoke [path-to-image]");
            eprintln!("The image is raw little-endian 16-bit words (low 12 bits used),");
            eprintln!("one per memory cell, loaded at field 0 address 0.");
            std::process::exit(1);
        }
    };

    println!("Running PDP-8 core image: {image_path} ({} bytes)", raw.len());

    let config = Config {
        hlt_exits_to_shell: true,
        ..Config::new()
    };
    let mut cpu = Cpu::new(config).expect("default configuration is always valid");

    for (i, word) in raw.chunks(2).enumerate() {
        let lo = word[0] as u16;
        let hi = *word.get(1).unwrap_or(&0) as u16;
        cpu.mem.write(i as u32, (lo | (hi << 8)) & 0o7777);
    }
    cpu.regs.pc = START_ADDRESS;

    let switches = Switches::default();
    let mut leds = Leds::default();

    let mut last_pc = cpu.regs.pc;
    let mut stuck_count = 0u32;
    let mut instruction_count: u64 = 0;
    let start_time = std::time::Instant::now();

    loop {
        let mut budget = 1i64;
        let outcome = cpu.run(&switches, &mut leds, &mut budget);
        instruction_count += 1;

        match outcome {
            RunOutcome::Halted(HaltReason::Halt, _) => {
                let elapsed = start_time.elapsed();
                println!("HLT reached. AC={:04o} L={}", cpu.regs.ac, cpu.regs.l as u8);
                println!();
                println!("Statistics:");
                println!("  Instructions executed: {instruction_count}");
                println!("  Time elapsed: {elapsed:?}");
                println!(
                    "  Effective speed: {:.2} kHz",
                    instruction_count as f64 / elapsed.as_secs_f64() / 1_000.0
                );
                std::process::exit(0);
            }
            RunOutcome::Halted(HaltReason::Loop, _) => {
                println!("Fatal JMP-to-self loop at PC={:04o} (interrupts disabled)", cpu.regs.pc);
                std::process::exit(1);
            }
            RunOutcome::Halted(reason, pending) => {
                println!("Halted: {reason:?} (pending action: {pending:?})");
                std::process::exit(1);
            }
            RunOutcome::BudgetExhausted => {}
        }

        if cpu.regs.pc == last_pc {
            stuck_count += 1;
            if stuck_count >= STUCK_THRESHOLD {
                println!("TRAP: PC stuck at {:04o} for {stuck_count} steps", cpu.regs.pc);
                println!();
                println!("Context: AC={:04o} L={} MQ={:04o}", cpu.regs.ac, cpu.regs.l as u8, cpu.regs.mq);
                println!("Instructions executed: {instruction_count}");
                std::process::exit(1);
            }
        } else {
            stuck_count = 0;
        }
        last_pc = cpu.regs.pc;

        if instruction_count % 1_000_000 == 0 {
            print!("\rExecuted {} million instructions, PC={:04o}...", instruction_count / 1_000_000, cpu.regs.pc);
            use std::io::Write;
            std::io::stdout().flush().unwrap();
        }
    }
}
