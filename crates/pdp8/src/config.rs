//! Construction-time configuration: memory size, EAE presence, the
//! TSC8-75 trap option, and the illegal-instruction/HLT policy knobs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub memory_size: usize,
    pub has_eae: bool,
    /// Whether an unassigned IOT or EAE-absent group-3 instruction halts
    /// (`true`) or silently no-ops (`false`).
    pub stop_inst: bool,
    /// TSC8-75 time-sharing trap option: intercepts HLT/OSR/JMS/JMP/IOT in
    /// user mode.
    pub tsc_enabled: bool,
    /// Classic behaviour: `HLT` exits to the shell rather than becoming a
    /// front-panel soft-Stop.
    pub hlt_exits_to_shell: bool,
    /// Detect the `JMP *-1` + `KSF` idle idiom and report it to the clock
    /// subsystem instead of burning instructions.
    pub idle_detection: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            memory_size: 32_768,
            has_eae: true,
            stop_inst: true,
            tsc_enabled: false,
            hlt_exits_to_shell: false,
            idle_detection: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
