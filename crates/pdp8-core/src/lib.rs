//! Core traits and shared value types for the PDP-8 simulator.

mod device;
mod halt;
mod panel;

pub use device::{Device, IotResult};
pub use halt::{HaltReason, PendingAction};
pub use panel::{momentary_bit, Leds, Switches};
