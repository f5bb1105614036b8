//! Integration tests driving full fetch/execute cycles through `Cpu::run`.

use pdp8::{Cpu, HaltReason, Leds, RunOutcome, Switches};

fn new_cpu() -> Cpu {
    let mut cpu = Cpu::new(pdp8::Config::new()).unwrap();
    cpu.regs.pc = 0o0200;
    cpu
}

fn run_n(cpu: &mut Cpu, n: i64) -> RunOutcome {
    let switches = Switches::default();
    let mut leds = Leds::default();
    let mut budget = n;
    cpu.run(&switches, &mut leds, &mut budget)
}

#[test]
fn cla_iac_ral_leaves_ac_advanced_and_rotated() {
    let mut cpu = new_cpu();
    cpu.mem.write(0o0200, 0o7305); // CLA CLL IAC RAL
    cpu.regs.ac = 0o4000;
    cpu.regs.l = true;

    run_n(&mut cpu, 1);

    assert_eq!(cpu.regs.ac, 2);
    assert!(!cpu.regs.l);
    assert_eq!(cpu.regs.pc, 0o0201);
}

#[test]
fn tad_accumulates_across_a_short_program() {
    let mut cpu = new_cpu();
    // TAD 0210; TAD 0211; HLT
    cpu.mem.write(0o0200, 0o1210);
    cpu.mem.write(0o0201, 0o1211);
    cpu.mem.write(0o0202, 0o7402); // HLT
    cpu.mem.write(0o0210, 5);
    cpu.mem.write(0o0211, 7);

    run_n(&mut cpu, 3);

    assert_eq!(cpu.regs.ac, 12);
    assert!(cpu.is_soft_stopped());
}

#[test]
fn isz_skip_advances_past_the_following_instruction() {
    let mut cpu = new_cpu();
    // ISZ 0210 (will wrap to zero and skip); CLA; HLT
    cpu.mem.write(0o0200, 0o2210);
    cpu.mem.write(0o0201, 0o7200); // CLA (skipped)
    cpu.mem.write(0o0202, 0o7402); // HLT
    cpu.mem.write(0o0210, 0o7777);
    cpu.regs.ac = 0o1234 & 0o7777;

    run_n(&mut cpu, 2);

    assert_eq!(cpu.mem.read(0o0210), 0);
    assert_eq!(cpu.regs.ac, 0o1234 & 0o7777, "skipped CLA must not have run");
}

#[test]
fn jms_then_indirect_return_round_trips() {
    let mut cpu = new_cpu();
    // JMS 0210; (return here, 0201); HLT
    // 0210: 0 (reserved for return address); JMP I 0210
    cpu.mem.write(0o0200, 0o4210);
    cpu.mem.write(0o0201, 0o7402); // HLT (the subroutine returns here)
    cpu.mem.write(0o0211, 0o5610); // JMP I 0210

    run_n(&mut cpu, 2);
    assert_eq!(cpu.mem.read(0o0210), 0o0201, "JMS must store the return PC");
    assert_eq!(cpu.regs.pc, 0o0211);

    run_n(&mut cpu, 1);
    assert_eq!(cpu.regs.pc, 0o0201);
}

#[test]
fn jmp_star_with_interrupts_off_is_a_fatal_loop() {
    let mut cpu = new_cpu();
    cpu.mem.write(0o0200, 0o5200); // JMP . — self-jump, ION never enabled
    let outcome = run_n(&mut cpu, 5);
    assert_eq!(outcome, RunOutcome::Halted(HaltReason::Loop, None));
}

#[test]
fn indirect_autoincrement_pointer_advances_before_use() {
    let mut cpu = new_cpu();
    // TAD I 10 (page-zero indirect through the autoincrement cell at 0o0010)
    cpu.mem.write(0o0200, 0o1410);
    cpu.mem.write(0o0010, 0o0300);
    cpu.mem.write(0o0301, 99);

    run_n(&mut cpu, 1);

    assert_eq!(cpu.regs.ac, 99);
    assert_eq!(cpu.mem.read(0o0010), 0o0301);
}

#[test]
fn eae_mode_b_multiply_through_group_three() {
    let mut cpu = new_cpu();
    cpu.regs.emode = true; // mode B, set earlier via 07431
    cpu.regs.mq = 3;
    cpu.regs.ac = 0;
    // MUY (key 2): the word following IR is a page-zero pointer in mode B.
    cpu.mem.write(0o0200, 0o7405);
    cpu.mem.write(0o0201, 0o0210);
    cpu.mem.write(0o0210, 5);

    run_n(&mut cpu, 1);

    assert_eq!(cpu.regs.mq, 0o17);
    assert_eq!(cpu.regs.ac, 0);
    assert_eq!(cpu.regs.sc, 0o14);
    assert_eq!(cpu.regs.pc, 0o0202, "MUY consumes the operand word too");
}

#[test]
fn interrupt_fires_between_instructions_once_the_ion_delay_expires() {
    let mut cpu = new_cpu();
    cpu.mem.write(0o0200, 0o6001); // ION
    cpu.mem.write(0o0201, 0o7402); // HLT (would run if the interrupt didn't intervene)
    cpu.mem.write(1, 0o7402); // interrupt handler: HLT immediately
    cpu.int_req.set_device_request(5, true);

    run_n(&mut cpu, 1); // ION executes
    assert!(cpu.int_req.ion);

    // One step to take the interrupt entry, one more to run the handler's HLT.
    run_n(&mut cpu, 2);
    assert_eq!(cpu.regs.pc, 2, "handler's HLT should have run at address 1");
    assert_eq!(cpu.regs.sf, 0, "save-field snapshot for field 0 is all zero");
}

#[test]
fn front_panel_load_address_sets_pc_from_switch_register() {
    let mut cpu = new_cpu();
    let mut switches = Switches::default();
    // Switches are active-low: SR value is the complement of the address.
    switches.sr = 0o1234 ^ 0o7777;
    // Held with Stop so the loaded address isn't immediately executed from.
    switches.momentary =
        (1 << pdp8::momentary_bit::LOAD_ADDRESS) | (1 << pdp8::momentary_bit::STOP);
    let mut leds = Leds::default();
    let mut budget = 1;
    cpu.run(&switches, &mut leds, &mut budget);
    assert_eq!(cpu.regs.pc, 0o1234);
    assert!(cpu.is_soft_stopped());
}
