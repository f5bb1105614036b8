//! IOT (opcode 6) dispatch: device 0 CPU control, device 010 power-fail,
//! devices 020-027 memory extension, and the generic 64-slot device table.

use crate::device_table::DeviceTable;
use crate::interrupt::IntReq;
use crate::registers::{field_index, field_value, Registers};
use pdp8_core::IotResult;

pub const DEVICE_CPU: u16 = 0o00;
pub const DEVICE_POWER_FAIL: u16 = 0o10;
pub const DEVICE_MEMEXT_LOW: u16 = 0o20;
pub const DEVICE_MEMEXT_HIGH: u16 = 0o27;

/// Decode `device = IR<3:8>` and `pulse = IR<9:11>` from a 12-bit IOT word.
pub fn decode(ir: u16) -> (u16, u16) {
    ((ir >> 3) & 0o77, ir & 0o7)
}

/// Whether this IOT is one of the CDF-family codes that must set
/// `tsc_cdf` for the TSC8-75 user-mode trap bookkeeping.
pub fn is_cdf_family(ir: u16) -> bool {
    ir & 0o7707 == 0o6201
}

/// Pack the status word read by `GTF`: L, GTF, ION, UB, IB field, DF field.
fn gtf_word(regs: &Registers, int_req: &IntReq) -> u16 {
    (u16::from(regs.l) << 11)
        | (u16::from(regs.gtf) << 10)
        | (u16::from(int_req.ion) << 9)
        | (u16::from(regs.ub) << 8)
        | (field_index(regs.ib) << 5)
        | (field_index(regs.df) << 2)
}

/// Unpack an AC value (as written by the guest before `RTF`) back into the
/// fields `GTF` reads, restoring L/GTF/UB/IB/DF and re-enabling interrupts
/// with the CIF delay armed.
fn apply_rtf_word(regs: &mut Registers, int_req: &mut IntReq, word: u16) {
    regs.l = word & (1 << 11) != 0;
    regs.gtf = word & (1 << 10) != 0;
    regs.ub = word & (1 << 8) != 0;
    regs.ib = field_value((word >> 5) & 7);
    regs.df = field_value((word >> 2) & 7);
    int_req.rtf();
}

/// Device 0: CPU control pulses SKON/ION/IOF/SRQ/GTF/RTF/SGT/CAF.
pub fn cpu_control(
    regs: &mut Registers,
    int_req: &mut IntReq,
    devices: &mut DeviceTable,
    pulse: u16,
    ac: u16,
) -> IotResult {
    match pulse {
        0 => {
            // SKON: skip if interrupts were on, then turn them off.
            let was_on = int_req.ion;
            int_req.disable_ion();
            if was_on {
                IotResult::skip(ac)
            } else {
                IotResult::new(ac)
            }
        }
        1 => {
            int_req.enable_ion();
            IotResult::new(ac)
        }
        2 => {
            int_req.disable_ion();
            IotResult::new(ac)
        }
        3 => {
            if int_req.any_request() {
                IotResult::skip(ac)
            } else {
                IotResult::new(ac)
            }
        }
        4 => IotResult::new(ac | gtf_word(regs, int_req)),
        5 => {
            apply_rtf_word(regs, int_req, ac);
            IotResult::new(ac)
        }
        6 => {
            if regs.gtf {
                IotResult::skip(ac)
            } else {
                IotResult::new(ac)
            }
        }
        7 => {
            int_req.caf();
            regs.sc = 0;
            regs.gtf = false;
            devices.reset_all();
            IotResult::new(ac)
        }
        _ => IotResult::new(ac),
    }
}

/// Device 010: power-fail SBE/SPL/CAL.
pub fn power_fail(int_req: &mut IntReq, pulse: u16, ac: u16) -> IotResult {
    match pulse {
        0 => {
            // SBE: skip if a power-fail is pending, and clear it.
            let pending = int_req.pwr;
            int_req.pwr = false;
            if pending {
                IotResult::skip(ac)
            } else {
                IotResult::new(ac)
            }
        }
        1 | 2 => IotResult::new(ac),
        _ => IotResult::new(ac),
    }
}

/// Devices 020-027: memory extension CDF/CIF/CDF-CIF and the pulse-4
/// sub-codes CINT/RDF/RIF/RIB/RMF/SINT/CUF/SUF.
pub fn memory_extension(regs: &mut Registers, int_req: &mut IntReq, ir: u16, ac: u16) -> IotResult {
    let (device, pulse) = decode(ir);
    let n = device & 7;
    match pulse {
        1 => {
            regs.df = field_value(n);
            IotResult::new(ac)
        }
        2 => {
            regs.ib = field_value(n);
            int_req.arm_cif_pending();
            IotResult::new(ac)
        }
        3 => {
            regs.df = field_value(n);
            regs.ib = field_value(n);
            int_req.arm_cif_pending();
            IotResult::new(ac)
        }
        4 => match n {
            0 => {
                int_req.uf_violation = false;
                IotResult::new(ac)
            }
            1 => IotResult::new(ac | (field_index(regs.df) << 3)),
            2 => IotResult::new(ac | (field_index(regs.if_) << 3)),
            3 => IotResult::new(ac | regs.pack_sf()),
            4 => {
                regs.unpack_sf(ac & 0o177);
                IotResult::new(ac)
            }
            5 => {
                if int_req.any_request() {
                    IotResult::skip(ac)
                } else {
                    IotResult::new(ac)
                }
            }
            6 => {
                regs.ub = false;
                IotResult::new(ac)
            }
            7 => {
                regs.ub = true;
                IotResult::new(ac)
            }
            _ => IotResult::new(ac),
        },
        _ => IotResult::new(ac),
    }
}
