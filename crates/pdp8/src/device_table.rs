//! The 64-slot device dispatch table keyed by IOT device number.

use crate::interrupt::IntReq;
use pdp8_core::{Device, IotResult};

const SLOTS: usize = 64;

pub struct DeviceTable {
    slots: Vec<Option<Box<dyn Device>>>,
}

impl DeviceTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(SLOTS);
        slots.resize_with(SLOTS, || None);
        Self { slots }
    }

    /// Register a device at its own `device_number()`. Fatal at boot if two
    /// devices claim the same slot.
    pub fn register(&mut self, device: Box<dyn Device>) -> Result<(), String> {
        let slot = device.device_number() as usize & (SLOTS - 1);
        if self.slots[slot].is_some() {
            return Err(format!(
                "device conflict: slot {slot:#04o} is already assigned"
            ));
        }
        self.slots[slot] = Some(device);
        Ok(())
    }

    /// Dispatch an IOT to the device at `device_number`. `None` means the
    /// slot is unassigned (an illegal-IOT condition).
    pub fn dispatch(&mut self, device_number: u16, ir: u16, ac: u16) -> Option<IotResult> {
        let slot = self.slots.get_mut(device_number as usize)?;
        slot.as_mut().map(|device| device.iot(ir, ac))
    }

    pub fn reset_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.reset();
        }
    }

    /// Pull every registered device's request line into `int_req`.
    pub fn sync_requests(&self, int_req: &mut IntReq) {
        for (number, slot) in self.slots.iter().enumerate() {
            if let Some(device) = slot {
                int_req.set_device_request(number as u8, device.request());
            }
        }
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}
