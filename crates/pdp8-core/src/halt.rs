/// Why `Cpu::run` returned control to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// `HLT` reached in a build where `HLT` exits to the shell rather than
    /// becoming a soft-Stop (see `Config::hlt_exits_to_shell`).
    Halt,
    /// A registered execution breakpoint matched the fetch address.
    Breakpoint,
    /// `JMP *` with interrupts off: a fatal infinite loop for the guest.
    Loop,
    /// An unassigned IOT or an EAE-absent group-3 instruction, with
    /// `stop_inst` set.
    IllegalInstruction,
    /// A device table could not be built because two devices claimed the
    /// same slot, or some other boot-time configuration fault.
    Configuration,
    /// A device callback embedded a reason code in the high bits of its
    /// return value.
    Device(u16),
}

/// An out-of-band request encoded by the front panel's chorded switches,
/// reported to the host alongside a [`HaltReason`] instead of being
/// smuggled through an unnamed integer flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Mount the device whose code was selected on the DF switch column.
    MountDevice(u8),
    /// Run the boot script numbered by the IF switch column.
    RunScript(u8),
    Shutdown,
    Reboot,
    UsbMount,
    UsbUnmount,
}
