//! Front-panel bridge: momentary-switch edge handling (Start/Stop/Continue/
//! Deposit/Examine/LoadAddress/SingStep/SingInst) and the out-of-band
//! chord commands the PiDP-8/I console encodes on its switch rows.
//!
//! The source debounces each momentary switch with a persistent "already
//! handled" bit: set on level-asserted, cleared on level-released, action
//! fires only on the 0→1 transition. `EdgeLatch` is that bit.

use pdp8_core::{momentary_bit, HaltReason, PendingAction, Switches};

#[derive(Debug, Clone, Copy, Default)]
struct EdgeLatch {
    held: bool,
}

impl EdgeLatch {
    /// Returns `true` exactly on the cycle `level` transitions from low to
    /// high.
    fn poll(&mut self, level: bool) -> bool {
        let rising = level && !self.held;
        self.held = level;
        rising
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrontPanel {
    start: EdgeLatch,
    continue_: EdgeLatch,
    deposit: EdgeLatch,
    examine: EdgeLatch,
    sing_inst: EdgeLatch,
    /// Whether `SingInst` granted a one-shot instruction while running;
    /// cleared once that instruction completes.
    pub single_step_armed: bool,
}

/// The outcome of one front-panel poll: whether to force a soft-Stop this
/// cycle, and whether the momentary row asked for an out-of-band action.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelEdges {
    pub start_pressed: bool,
    pub continue_pressed: bool,
    pub deposit_pressed: bool,
    pub examine_pressed: bool,
    pub stop_level: bool,
    pub sing_inst_edge: bool,
    pub pending_action: Option<PendingAction>,
    pub halt: Option<HaltReason>,
}

impl FrontPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn bit(switches: &Switches, bit: u16) -> bool {
        switches.momentary & (1 << bit) != 0
    }

    /// Decode the DF/IF switch columns and SingStep chords into an
    /// out-of-band [`PendingAction`], per the composite-command scan the
    /// console performs on a SingInst leading edge while stopped.
    fn decode_chord(switches: &Switches) -> Option<PendingAction> {
        let sing_step = Self::bit(switches, momentary_bit::SING_STEP);
        if sing_step {
            if Self::bit(switches, momentary_bit::START) {
                return Some(PendingAction::Shutdown);
            }
            if Self::bit(switches, momentary_bit::CONTINUE) {
                return Some(PendingAction::Reboot);
            }
            if Self::bit(switches, momentary_bit::LOAD_ADDRESS) {
                return Some(PendingAction::UsbMount);
            }
            if Self::bit(switches, momentary_bit::DEPOSIT) {
                return Some(PendingAction::UsbUnmount);
            }
        }
        let device_code = switches.control & 0o7;
        if device_code != 0 {
            return Some(PendingAction::MountDevice(device_code as u8));
        }
        let script = (switches.control >> 3) & 0o7;
        if script != 0 {
            return Some(PendingAction::RunScript(script as u8));
        }
        None
    }

    /// Poll every momentary switch for this cycle. `stopped` tells the
    /// scan whether the machine is currently halted (SingInst's chord-scan
    /// role) or running (its single-instruction-step role).
    pub fn poll(&mut self, switches: &Switches, stopped: bool) -> PanelEdges {
        let mut edges = PanelEdges::default();

        let sing_inst_level = Self::bit(switches, momentary_bit::SING_INST);
        edges.sing_inst_edge = self.sing_inst.poll(sing_inst_level);
        if edges.sing_inst_edge {
            if stopped {
                edges.pending_action = Self::decode_chord(switches);
                if let Some(PendingAction::RunScript(_)) = edges.pending_action {
                    edges.halt = Some(HaltReason::Halt);
                }
            } else {
                self.single_step_armed = true;
            }
        }

        edges.start_pressed = self
            .start
            .poll(Self::bit(switches, momentary_bit::START));
        edges.continue_pressed = self
            .continue_
            .poll(Self::bit(switches, momentary_bit::CONTINUE));
        edges.deposit_pressed = self
            .deposit
            .poll(Self::bit(switches, momentary_bit::DEPOSIT));
        edges.examine_pressed = self
            .examine
            .poll(Self::bit(switches, momentary_bit::EXAMINE));
        edges.stop_level = Self::bit(switches, momentary_bit::STOP);

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switches_with_momentary(bits: u16) -> Switches {
        Switches {
            sr: 0,
            control: 0,
            momentary: bits,
        }
    }

    #[test]
    fn momentary_switches_fire_once_per_press() {
        let mut panel = FrontPanel::new();
        let held = switches_with_momentary(1 << momentary_bit::START);
        let edges1 = panel.poll(&held, true);
        assert!(edges1.start_pressed);
        let edges2 = panel.poll(&held, true);
        assert!(!edges2.start_pressed, "must not re-fire while held");

        let released = switches_with_momentary(0);
        panel.poll(&released, true);
        let edges3 = panel.poll(&held, true);
        assert!(edges3.start_pressed, "releasing and re-pressing re-arms it");
    }

    #[test]
    fn sing_inst_while_running_arms_single_step_instead_of_a_chord() {
        let mut panel = FrontPanel::new();
        let held = switches_with_momentary(1 << momentary_bit::SING_INST);
        let edges = panel.poll(&held, false);
        assert!(edges.sing_inst_edge);
        assert!(edges.pending_action.is_none());
        assert!(panel.single_step_armed);
    }

    #[test]
    fn load_address_is_not_edge_gated() {
        // LoadAddress has no latch at all in FrontPanel; Cpu applies it
        // every cycle it reads as asserted. Nothing to debounce here.
        let switches = switches_with_momentary(1 << momentary_bit::LOAD_ADDRESS);
        assert_eq!(
            switches.momentary & (1 << momentary_bit::LOAD_ADDRESS),
            1 << momentary_bit::LOAD_ADDRESS
        );
    }
}
