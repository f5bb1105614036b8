//! A cycle-stepped PDP-8 CPU core: registers, memory, the interrupt state
//! machine, the Extended Arithmetic Element, IOT dispatch, and the
//! front-panel bridge a console binary drives.
//!
//! [`Cpu`] owns everything; a host crate supplies [`pdp8_core::Device`]
//! peripherals, a [`Switches`](pdp8_core::Switches) bank to read, and a
//! [`Leds`](pdp8_core::Leds) bank to write, then calls [`Cpu::run`] in a
//! loop with whatever instruction budget its scheduler affords this tick.

mod addressing;
mod config;
mod cpu;
mod device_table;
mod eae;
mod history;
mod interrupt;
mod iot;
mod memory;
mod panel;
mod pcqueue;
mod registers;

pub use config::Config;
pub use cpu::{Cpu, RunOutcome};
pub use device_table::DeviceTable;
pub use history::{History, InstHistory};
pub use interrupt::IntReq;
pub use memory::{Memory, MAX_SIZE as MAX_MEMORY_SIZE};
pub use pcqueue::PcQueue;
pub use registers::Registers;

pub use pdp8_core::{momentary_bit, Device, HaltReason, IotResult, Leds, PendingAction, Switches};
