//! Top-level `Cpu`: register file, memory, interrupt state machine, opcode
//! dispatch, and the front-panel bridge tied together behind a cooperative
//! `run()` loop, mirroring `sim_instr()`.

use std::collections::HashSet;

use pdp8_core::{Device, HaltReason, Leds, PendingAction, Switches};

use crate::addressing::effective_address;
use crate::config::Config;
use crate::device_table::DeviceTable;
use crate::eae;
use crate::history::{History, InstHistory};
use crate::interrupt::IntReq;
use crate::iot;
use crate::memory::Memory;
use crate::panel::FrontPanel;
use crate::pcqueue::PcQueue;
use crate::registers::{field_index, field_value, Registers};

const KSF: u16 = 0o6031;

/// Why `Cpu::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted(HaltReason, Option<PendingAction>),
    BudgetExhausted,
}

pub struct Cpu {
    pub regs: Registers,
    pub mem: Memory,
    pub int_req: IntReq,
    pub devices: DeviceTable,
    pub pcq: PcQueue,
    pub history: History,
    config: Config,
    panel: FrontPanel,
    breakpoints: HashSet<u32>,
    soft_stop: bool,
    /// Front-panel lamp registers: MA trails PC (the address last fetched
    /// or referenced), MB shows the last value carried on the bus.
    pub ma: u16,
    pub mb: u16,
    tsc_ir: u16,
    tsc_cdf: bool,
    tsc_pc: u16,
    /// Switch register as of the start of this instruction cycle; `OSR`
    /// only ever reads this shadow, never the live switch bank mid-cycle.
    current_sr: u16,
    /// Effective address/operand of the last memory-reference instruction,
    /// for the history ring; `None` for every other instruction class.
    last_ea: Option<u32>,
    last_operand: Option<u16>,
}

impl Cpu {
    pub fn new(config: Config) -> Result<Self, String> {
        Ok(Self {
            regs: Registers::new(),
            mem: Memory::new(config.memory_size)?,
            int_req: IntReq::new(),
            devices: DeviceTable::new(),
            pcq: PcQueue::new(),
            history: History::disabled(),
            config,
            panel: FrontPanel::new(),
            breakpoints: HashSet::new(),
            soft_stop: false,
            ma: 0,
            mb: 0,
            tsc_ir: 0,
            tsc_cdf: false,
            tsc_pc: 0,
            current_sr: 0,
            last_ea: None,
            last_operand: None,
        })
    }

    pub fn register_device(&mut self, device: Box<dyn Device>) -> Result<(), String> {
        self.devices.register(device)
    }

    pub fn add_breakpoint(&mut self, address: u32) {
        self.breakpoints.insert(address);
    }

    pub fn remove_breakpoint(&mut self, address: u32) {
        self.breakpoints.remove(&address);
    }

    pub fn is_soft_stopped(&self) -> bool {
        self.soft_stop
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reset to power-up state. Memory contents are preserved (matching the
    /// console's own Start behaviour).
    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.int_req = IntReq::new();
        self.pcq = PcQueue::new();
        self.soft_stop = false;
        self.ma = 0;
        self.mb = 0;
        self.devices.reset_all();
    }

    /// Run until a hard halt or the instruction budget is exhausted.
    /// `switches`/`leds` are the shared front-panel banks; `budget` is
    /// decremented once per instruction (the only suspension point).
    pub fn run(&mut self, switches: &Switches, leds: &mut Leds, budget: &mut i64) -> RunOutcome {
        loop {
            if *budget <= 0 {
                return RunOutcome::BudgetExhausted;
            }

            self.current_sr = switches.sr ^ 0o7777;
            self.devices.sync_requests(&mut self.int_req);
            let stopped = self.soft_stop;
            let edges = self.panel.poll(switches, stopped);

            if let Some(reason) = edges.halt {
                return RunOutcome::Halted(reason, edges.pending_action);
            }
            if edges.pending_action.is_some() {
                return RunOutcome::Halted(HaltReason::Halt, edges.pending_action);
            }

            if edges.start_pressed {
                self.int_req.disable_ion();
                self.regs.ac = 0;
                self.mb = 0;
                self.ma = (u32::from(self.regs.if_) + u32::from(self.regs.pc)) as u16;
                self.soft_stop = false;
            }
            if edges.continue_pressed {
                self.soft_stop = false;
            }
            if switches.momentary & (1 << pdp8_core::momentary_bit::LOAD_ADDRESS) != 0 {
                self.regs.pc = switches.sr ^ 0o7777;
                self.regs.df = field_value((switches.control >> 3) & 7);
                self.regs.if_ = field_value(switches.control & 7);
                self.regs.ib = self.regs.if_;
            }
            if edges.deposit_pressed {
                let value = switches.sr ^ 0o7777;
                self.mem.write(u32::from(self.regs.if_) + u32::from(self.regs.pc), value);
                self.mb = value;
                self.ma = (u32::from(self.regs.if_) + u32::from(self.regs.pc)) as u16;
                self.regs.pc = (self.regs.pc + 1) & 0o7777;
            }
            if edges.examine_pressed {
                let addr = u32::from(self.regs.if_) + u32::from(self.regs.pc);
                self.mb = self.mem.read(addr);
                self.ma = addr as u16;
                self.regs.pc = (self.regs.pc + 1) & 0o7777;
            }
            if edges.stop_level {
                self.soft_stop = true;
            }

            self.write_leds(leds);

            if self.soft_stop {
                *budget -= 1;
                continue;
            }

            if self.int_req.fires() {
                self.enter_interrupt();
                *budget -= 1;
                continue;
            }

            let fetch_pc = self.regs.pc;
            let fetch_addr = u32::from(self.regs.if_) + u32::from(fetch_pc);
            if self.breakpoints.contains(&fetch_addr) {
                return RunOutcome::Halted(HaltReason::Breakpoint, None);
            }

            self.ma = fetch_addr as u16;
            let ir = self.mem.read(fetch_addr);
            self.mb = ir;
            self.regs.pc = (fetch_pc + 1) & 0o7777;

            let outcome = self.execute(ir, fetch_pc);

            self.int_req.tick_ion_delay();
            self.push_history(fetch_pc, ir);
            self.write_leds(leds);
            *budget -= 1;

            if self.panel.single_step_armed {
                self.panel.single_step_armed = false;
                self.soft_stop = true;
            }

            match outcome {
                Some(StepOutcome::Halt(reason)) => return RunOutcome::Halted(reason, None),
                Some(StepOutcome::Idle) => {
                    *budget = 0;
                }
                None => {}
            }
        }
    }

    fn push_history(&mut self, pc: u16, ir: u16) {
        if !self.history.is_enabled() {
            return;
        }
        self.history.push(InstHistory {
            pc,
            ir,
            lac: self.regs.lac(),
            mq: self.regs.mq,
            ea: self.last_ea,
            operand: self.last_operand,
        });
    }

    fn write_leds(&self, leds: &mut Leds) {
        let word = self.mem.read(u32::from(self.ma));
        let instruction_class = (word >> 9) & 7;
        let class_bar = 1u16 << instruction_class;
        let defer = u16::from(word & 0o0400 != 0);

        leds.pc = self.regs.pc;
        leds.ma = self.ma;
        leds.mb = self.mb;
        leds.ac = self.regs.ac;
        leds.mq = self.regs.mq;
        leds.state = (class_bar << 1) | defer;
        // WC/CA/BREAK reflect a data-break (DMA) channel, which this crate
        // doesn't model; those bits stay dark.
        leds.status = (u16::from(self.int_req.ion) << 5)
            | (u16::from(!self.soft_stop) << 4)
            | (u16::from(self.soft_stop) << 3);
        leds.fields = (field_index(self.regs.if_) << 4) | (field_index(self.regs.df) << 1) | u16::from(self.regs.l);
    }

    fn enter_interrupt(&mut self) {
        self.int_req.ion = false;
        self.regs.sf = self.regs.pack_sf();
        self.pcq.push(u32::from(self.regs.if_) + u32::from(self.regs.pc));
        self.mem.write(0, self.regs.pc);
        self.regs.if_ = 0;
        self.regs.ib = 0;
        self.regs.df = 0;
        self.regs.uf = false;
        self.regs.ub = false;
        self.regs.pc = 1;
    }

    fn execute(&mut self, ir: u16, fetch_pc: u16) -> Option<StepOutcome> {
        let opcode = (ir >> 9) & 7;
        self.last_ea = None;
        self.last_operand = None;
        match opcode {
            0 => {
                let ea = effective_address(&self.regs, &mut self.mem, ir, fetch_pc, self.regs.if_, self.regs.df);
                let val = self.mem.read(ea);
                self.last_ea = Some(ea);
                self.last_operand = Some(val);
                let lac = self.regs.lac();
                self.regs.set_lac(lac & (val | 0o10000));
                None
            }
            1 => {
                let ea = effective_address(&self.regs, &mut self.mem, ir, fetch_pc, self.regs.if_, self.regs.df);
                let val = self.mem.read(ea);
                self.last_ea = Some(ea);
                self.last_operand = Some(val);
                let lac = (self.regs.lac() + val) & 0o17777;
                self.regs.set_lac(lac);
                None
            }
            2 => {
                let ea = effective_address(&self.regs, &mut self.mem, ir, fetch_pc, self.regs.if_, self.regs.df);
                let incremented = (self.mem.read(ea) + 1) & 0o7777;
                self.mem.write(ea, incremented);
                self.last_ea = Some(ea);
                self.last_operand = Some(incremented);
                if incremented == 0 {
                    self.regs.pc = (self.regs.pc + 1) & 0o7777;
                }
                None
            }
            3 => {
                let ea = effective_address(&self.regs, &mut self.mem, ir, fetch_pc, self.regs.if_, self.regs.df);
                self.mem.write(ea, self.regs.ac);
                self.last_ea = Some(ea);
                self.last_operand = Some(self.regs.ac);
                self.regs.ac = 0;
                None
            }
            4 => self.jms(ir, fetch_pc),
            5 => self.jmp(ir, fetch_pc),
            6 => self.iot(ir),
            7 => self.opr(ir, fetch_pc),
            _ => unreachable!(),
        }
    }

    fn jms(&mut self, ir: u16, fetch_pc: u16) -> Option<StepOutcome> {
        let ea = effective_address(&self.regs, &mut self.mem, ir, fetch_pc, self.regs.ib, self.regs.ib);
        self.pcq.push(u32::from(self.regs.if_) + u32::from(fetch_pc));
        let suppress_commit = self.regs.uf && self.config.tsc_enabled;
        if !suppress_commit {
            self.regs.if_ = self.regs.ib;
            self.regs.uf = self.regs.ub;
        } else {
            self.tsc_ir = ir;
            self.tsc_cdf = false;
            self.tsc_pc = fetch_pc;
            self.int_req.tsc = true;
        }
        self.int_req.clear_cif_pending();
        self.mem.write(ea, self.regs.pc);
        let offset = (ea & 0o7777) as u16;
        self.regs.pc = (offset + 1) & 0o7777;
        None
    }

    fn jmp(&mut self, ir: u16, fetch_pc: u16) -> Option<StepOutcome> {
        let ea = effective_address(&self.regs, &mut self.mem, ir, fetch_pc, self.regs.ib, self.regs.ib);
        self.pcq.push(u32::from(self.regs.if_) + u32::from(fetch_pc));
        let suppress_commit = self.regs.uf && self.config.tsc_enabled;
        if !suppress_commit {
            self.regs.if_ = self.regs.ib;
            self.regs.uf = self.regs.ub;
        } else {
            self.tsc_ir = ir;
            self.tsc_cdf = false;
            self.tsc_pc = fetch_pc;
            self.int_req.tsc = true;
        }
        self.int_req.clear_cif_pending();

        let ea_field = ea & !0o7777;
        let offset = (ea & 0o7777) as u16;
        let same_field = ea_field == u32::from(self.regs.if_);

        let mut outcome = None;
        if self.config.idle_detection && same_field && offset == fetch_pc {
            if !self.int_req.ion {
                outcome = Some(StepOutcome::Halt(HaltReason::Loop));
            } else if !self.int_req.any_request() {
                outcome = Some(StepOutcome::Idle);
            }
        } else if self.config.idle_detection
            && same_field
            && !self.int_req.ion
            && offset == fetch_pc.wrapping_sub(1) & 0o7777
        {
            let prior = self.mem.read(ea_field + u32::from(offset));
            if prior == KSF {
                outcome = Some(StepOutcome::Idle);
            }
        }

        self.regs.pc = offset;
        outcome
    }

    fn iot(&mut self, ir: u16) -> Option<StepOutcome> {
        let (device, pulse) = iot::decode(ir);
        let ac = self.regs.ac;

        if self.regs.uf && self.config.tsc_enabled {
            self.int_req.uf_violation = true;
            self.tsc_ir = ir;
            self.tsc_cdf = iot::is_cdf_family(ir);
            return None;
        }

        let result = match device {
            iot::DEVICE_CPU => {
                iot::cpu_control(&mut self.regs, &mut self.int_req, &mut self.devices, pulse, ac)
            }
            iot::DEVICE_POWER_FAIL => iot::power_fail(&mut self.int_req, pulse, ac),
            iot::DEVICE_MEMEXT_LOW..=iot::DEVICE_MEMEXT_HIGH => {
                iot::memory_extension(&mut self.regs, &mut self.int_req, ir, ac)
            }
            _ => match self.devices.dispatch(device, ir, ac) {
                Some(result) => result,
                None => {
                    return if self.config.stop_inst {
                        Some(StepOutcome::Halt(HaltReason::IllegalInstruction))
                    } else {
                        None
                    };
                }
            },
        };

        self.regs.ac = result.ac & 0o7777;
        if result.skip {
            self.regs.pc = (self.regs.pc + 1) & 0o7777;
        }
        result.halt.map(|code| StepOutcome::Halt(HaltReason::Device(code)))
    }

    fn opr(&mut self, ir: u16, fetch_pc: u16) -> Option<StepOutcome> {
        if ir & 0o0400 == 0 {
            self.opr_group1(ir, fetch_pc);
            None
        } else if ir & 1 == 0 {
            self.opr_group2(ir)
        } else {
            self.opr_group3(ir)
        }
    }

    fn opr_group1(&mut self, ir: u16, fetch_pc: u16) {
        let mut lac = self.regs.lac();
        if ir & 0o0200 != 0 {
            lac &= 0o10000; // CLA
        }
        if ir & 0o0100 != 0 {
            lac &= 0o07777; // CLL
        }
        if ir & 0o0040 != 0 {
            lac ^= 0o07777; // CMA
        }
        if ir & 0o0020 != 0 {
            lac ^= 0o10000; // CML
        }
        if ir & 1 != 0 {
            lac = (lac + 1) & 0o17777; // IAC
        }

        let rar = ir & 0o0010 != 0;
        let ral = ir & 0o0004 != 0;
        let modifier = ir & 0o0002 != 0;

        lac = match (ral, rar, modifier) {
            (false, false, false) => lac,
            (false, false, true) => {
                let ac = (lac & 0o7777) as u16;
                let swapped = ((ac & 0o77) << 6) | ((ac >> 6) & 0o77);
                (lac & 0o10000) | swapped
            }
            (true, false, false) => rotate_left(lac, 1),
            (true, false, true) => rotate_left(lac, 2),
            (false, true, false) => rotate_right(lac, 1),
            (false, true, true) => rotate_right(lac, 2),
            (true, true, false) => lac & (ir | 0o10000),
            (true, true, true) => (lac & 0o10000) | (self.ma & 0o7600) | (ir & 0o177),
        };

        self.regs.set_lac(lac);
    }

    fn opr_group2(&mut self, ir: u16) -> Option<StepOutcome> {
        if self.regs.uf && self.config.tsc_enabled && (ir & 0o0006 != 0) {
            self.int_req.uf_violation = true;
            self.tsc_ir = ir;
            self.tsc_cdf = false;
            return None;
        }

        let cla = ir & 0o0200 != 0;
        let sma = ir & 0o0100 != 0;
        let sza = ir & 0o0040 != 0;
        let snl = ir & 0o0020 != 0;
        let rss = ir & 0o0010 != 0;
        let osr = ir & 0o0004 != 0;
        let hlt = ir & 0o0002 != 0;

        let ac_neg = self.regs.ac & 0o4000 != 0;
        let ac_zero = self.regs.ac == 0;
        let link = self.regs.l;

        let any_true = (sma && ac_neg) || (sza && ac_zero) || (snl && link);
        let all_false = !(sma && ac_neg) && !(sza && ac_zero) && !(snl && link);
        let skip = if rss { all_false } else { any_true };

        if skip {
            self.regs.pc = (self.regs.pc + 1) & 0o7777;
        }
        if cla {
            self.regs.ac = 0;
        }
        if osr {
            self.regs.osr = self.current_sr; // refreshed only on execution
            self.regs.ac |= self.regs.osr;
        }
        if hlt {
            if self.config.hlt_exits_to_shell {
                return Some(StepOutcome::Halt(HaltReason::Halt));
            }
            self.soft_stop = true;
        }
        None
    }

    fn opr_group3(&mut self, ir: u16) -> Option<StepOutcome> {
        if ir == 0o7431 {
            self.regs.emode = true;
            return None;
        }
        if ir == 0o7447 {
            self.regs.emode = false;
            self.regs.gtf = false;
            return None;
        }

        let cla = ir & 0o0200 != 0;
        let mqa = ir & 0o0100 != 0;
        let mql = ir & 0o0020 != 0;
        let temp = self.regs.mq;

        if cla {
            self.regs.ac = 0;
        }
        if mql {
            self.regs.mq = self.regs.ac;
            self.regs.ac = 0;
        }
        if mqa {
            self.regs.ac |= temp;
        }

        let key = ((ir & 0o0040 != 0) as u16) << 3 | ((ir >> 1) & 0o7);
        if key == 0 {
            return None;
        }
        if !self.config.has_eae {
            return if self.config.stop_inst {
                Some(StepOutcome::Halt(HaltReason::IllegalInstruction))
            } else {
                None
            };
        }

        let skip = eae::execute_key(&mut self.regs, &mut self.mem, key, self.regs.emode);
        if skip {
            self.regs.pc = (self.regs.pc + 1) & 0o7777;
        }
        None
    }
}

fn rotate_left(lac: u16, times: u32) -> u16 {
    let mut v = lac;
    for _ in 0..times {
        v = ((v << 1) | (v >> 12)) & 0o17777;
    }
    v
}

fn rotate_right(lac: u16, times: u32) -> u16 {
    let mut v = lac;
    for _ in 0..times {
        v = ((v >> 1) | ((v & 1) << 12)) & 0o17777;
    }
    v
}

enum StepOutcome {
    Halt(HaltReason),
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu() -> Cpu {
        Cpu::new(Config::new()).unwrap()
    }

    #[test]
    fn cla_cll_iac_ral_matches_documented_scenario() {
        let mut cpu = cpu();
        cpu.regs.ac = 7;
        cpu.regs.l = true;
        cpu.opr_group1(0o7305, 0); // CLA CLL IAC RAL
        assert_eq!(cpu.regs.ac, 2);
        assert!(!cpu.regs.l);
    }

    #[test]
    fn tad_is_l_accurate() {
        let mut cpu = cpu();
        cpu.regs.l = false;
        cpu.regs.ac = 0o7777;
        cpu.mem.write(0o0100, 1);
        cpu.regs.pc = 0;
        cpu.mem.write(0, 0o1100); // TAD page-zero 0100
        let ir = cpu.mem.read(0);
        cpu.regs.pc = 1;
        cpu.execute(ir, 0);
        assert!(cpu.regs.l);
        assert_eq!(cpu.regs.ac, 0);
    }

    #[test]
    fn isz_of_07777_yields_zero_and_skips() {
        let mut cpu = cpu();
        cpu.mem.write(0o0100, 0o7777);
        let ir = 0o2100; // ISZ page-zero 0100
        cpu.regs.pc = 1;
        cpu.execute(ir, 0);
        assert_eq!(cpu.mem.read(0o0100), 0);
        assert_eq!(cpu.regs.pc, 2);
    }

    #[test]
    fn isz_of_07776_does_not_skip() {
        let mut cpu = cpu();
        cpu.mem.write(0o0100, 0o7776);
        let ir = 0o2100;
        cpu.regs.pc = 1;
        cpu.execute(ir, 0);
        assert_eq!(cpu.mem.read(0o0100), 0o7777);
        assert_eq!(cpu.regs.pc, 1);
    }

    #[test]
    fn indirect_autoincrement_through_page_zero() {
        let mut cpu = cpu();
        cpu.mem.write(0o0010, 0o3777);
        let ir = 0o1410; // TAD indirect page-zero 0010
        cpu.regs.pc = 1;
        cpu.regs.ac = 0;
        cpu.mem.write(0o4000, 0o0055);
        cpu.execute(ir, 0);
        assert_eq!(cpu.regs.ac, 0o0055);
        assert_eq!(cpu.mem.read(0o0010), 0o4000);
    }

    #[test]
    fn jmp_star_with_ion_off_is_fatal_loop() {
        let mut cpu = cpu();
        cpu.regs.pc = 0o0200;
        cpu.mem.write(0o0200, 0o5200); // JMP . (current-page, offset 0: self)
        let ir = cpu.mem.read(0o0200);
        cpu.regs.pc = 0o0201;
        let outcome = cpu.execute(ir, 0o0200);
        assert!(matches!(outcome, Some(StepOutcome::Halt(HaltReason::Loop))));
    }

    #[test]
    fn eae_mode_switch_round_trip_leaves_emode_and_gtf_clear() {
        let mut cpu = cpu();
        cpu.regs.emode = false;
        cpu.regs.gtf = true;
        cpu.opr_group3(0o7431);
        assert!(cpu.regs.emode);
        cpu.opr_group3(0o7447);
        assert!(!cpu.regs.emode);
        assert!(!cpu.regs.gtf);
    }

    #[test]
    fn interrupt_entry_matches_documented_scenario() {
        let mut cpu = cpu();
        cpu.int_req.enable_ion();
        cpu.int_req.tick_ion_delay();
        cpu.regs.df = field_value(3);
        cpu.regs.if_ = field_value(2);
        cpu.regs.uf = true;
        cpu.regs.pc = 0o1234;
        cpu.int_req.set_device_request(1, true);

        assert!(cpu.int_req.fires());
        cpu.enter_interrupt();

        assert_eq!(cpu.mem.read(0), 0o1234);
        assert_eq!(cpu.regs.sf, 0o123);
        assert_eq!(field_index(cpu.regs.if_), 0);
        assert_eq!(field_index(cpu.regs.df), 0);
        assert!(!cpu.regs.uf);
        assert!(!cpu.regs.ub);
        assert_eq!(cpu.regs.pc, 1);
    }
}
