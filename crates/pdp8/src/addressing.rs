//! Effective-address computation shared by the memory-reference opcodes
//! (AND/TAD/ISZ/DCA/JMS/JMP) and EAE mode-B's deferred operand fetch, both
//! of which use the same page-zero/current-page × direct/indirect layout.

use crate::memory::Memory;
use crate::registers::Registers;

/// Resolve the effective address encoded by `addr_word` (an instruction or
/// an EAE mode-B operand word sharing the classic page/indirect/offset
/// layout).
///
/// `direct_field` is the field a *direct*-mode reference resolves in (IF for
/// AND/TAD/ISZ/DCA and EAE operands; IB for JMS/JMP, whose target lands in
/// the field about to be committed, not the current one). `combine_field`
/// is the field an *indirect* pointer's target combines with (DF for
/// AND/TAD/ISZ/DCA operands, IB for JMS/JMP targets). The pointer itself is
/// always fetched from the current IF, regardless of either.
///
/// `fetch_pc` is the address the word containing `addr_word` was fetched
/// from (needed for current-page addressing; it is *not* the post-increment
/// PC).
pub fn effective_address(
    regs: &Registers,
    mem: &mut Memory,
    addr_word: u16,
    fetch_pc: u16,
    direct_field: u16,
    combine_field: u16,
) -> u32 {
    let current_page = addr_word & 0o0200 != 0;
    let indirect = addr_word & 0o0400 != 0;
    let offset = addr_word & 0o0177;

    let direct_offset = if current_page {
        (fetch_pc & 0o7600) | offset
    } else {
        offset
    };

    if !indirect {
        return u32::from(direct_field) + u32::from(direct_offset);
    }

    let pointer = mem.read_indirect(u32::from(regs.if_), direct_offset);
    u32::from(combine_field) + u32::from(pointer)
}
