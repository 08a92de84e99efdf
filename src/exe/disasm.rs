//! x86-64 instruction decoding and branch classification.

use super::dwarf::LineTable;
use crate::successors::Pos;
use iced_x86::{Decoder, DecoderOptions, FlowControl, Instruction, Mnemonic, OpKind};

/// A decoded instruction with its attributed source position.
#[derive(Debug, Clone, Default)]
pub struct AsmInstruction {
    pub inst: Instruction,
    pub pc: u64,
    pub pos: Pos,
}

impl AsmInstruction {
    /// Branch with a statically known target: `(target, unconditional)`.
    /// Indirect branches and calls are not transitions the checker can
    /// follow.
    pub fn branch_target(&self) -> Option<(u64, bool)> {
        let near = matches!(
            self.inst.op0_kind(),
            OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64
        );
        match self.inst.flow_control() {
            FlowControl::ConditionalBranch if near => {
                Some((self.inst.near_branch_target(), false))
            }
            FlowControl::UnconditionalBranch if near => {
                Some((self.inst.near_branch_target(), true))
            }
            _ => None,
        }
    }

    pub fn is_ret(&self) -> bool {
        self.inst.flow_control() == FlowControl::Return
    }

    /// Undefined-instruction traps; execution never continues past one.
    pub fn is_trap(&self) -> bool {
        matches!(
            self.inst.mnemonic(),
            Mnemonic::Ud0 | Mnemonic::Ud1 | Mnemonic::Ud2
        )
    }
}

/// Decode `[start, end)` of the text section, attributing each instruction
/// a source position from the line table. Undecodable bytes produce
/// placeholder instructions and decoding continues.
pub(crate) fn disassemble(
    text: &[u8],
    text_start: u64,
    start: u64,
    end: u64,
    lines: &LineTable,
) -> Vec<AsmInstruction> {
    let Some(lo) = start.checked_sub(text_start) else {
        return Vec::new();
    };
    let lo = lo as usize;
    let hi = (end.saturating_sub(text_start) as usize).min(text.len());
    if lo >= hi {
        return Vec::new();
    }

    let code = &text[lo..hi];
    let mut decoder = Decoder::with_ip(64, code, start, DecoderOptions::NONE);
    let mut out = Vec::new();
    while decoder.can_decode() {
        let inst = decoder.decode();
        let pc = inst.ip();
        out.push(AsmInstruction {
            inst,
            pc,
            pos: lines.pos_for_pc(pc),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(bytes: &[u8]) -> AsmInstruction {
        let mut decoder = Decoder::with_ip(64, bytes, 0x1000, DecoderOptions::NONE);
        let inst = decoder.decode();
        AsmInstruction {
            inst,
            pc: inst.ip(),
            pos: Pos::default(),
        }
    }

    #[test]
    fn classifies_ret() {
        let inst = decode_one(&[0xc3]);
        assert!(inst.is_ret());
        assert!(inst.branch_target().is_none());
    }

    #[test]
    fn classifies_unconditional_jump_with_target() {
        // jmp +5 (rel8): target = 0x1000 + 2 + 5
        let inst = decode_one(&[0xeb, 0x05]);
        assert_eq!(inst.branch_target(), Some((0x1007, true)));
    }

    #[test]
    fn classifies_conditional_jump_with_target() {
        // je +0x10 (rel8)
        let inst = decode_one(&[0x74, 0x10]);
        assert_eq!(inst.branch_target(), Some((0x1012, false)));
    }

    #[test]
    fn classifies_trap() {
        let inst = decode_one(&[0x0f, 0x0b]); // ud2
        assert!(inst.is_trap());
    }

    #[test]
    fn indirect_jump_has_no_target() {
        let inst = decode_one(&[0xff, 0xe0]); // jmp rax
        assert!(inst.branch_target().is_none());
    }
}
