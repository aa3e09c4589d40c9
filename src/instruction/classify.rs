// Copyright (C) 2024, 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Control flow classification of [`Instruction`]s

use super::operands::{Operands, RA, Register, ZERO};
use super::{Instruction, Opcode};

impl Instruction {
    /// Determine the branch target
    ///
    /// If this is a conditional branch, this fn returns the branch target
    /// relative to this instruction. Returns `None` for all other
    /// instructions. Jump instructions are not considered branch instructions.
    pub fn branch_target(&self) -> Option<i32> {
        use Opcode::*;

        match self.opcode? {
            beq | bne | blt | bge | bltu | bgeu | c_beqz | c_bnez => Some(self.operands.imm),
            _ => None,
        }
    }

    /// Determine the inferable jump target
    ///
    /// If this is a jump instruction that in itself determines the jump
    /// target, this fn returns that target relative to this instruction.
    ///
    /// A `jalr` instruction's target is never considered inferable unless the
    /// source register is the `zero` register, even if it is preceeded
    /// directly by an `auipc` defining a constant jump target. See
    /// [`sequential_jump_target`][Self::sequential_jump_target] for the latter.
    pub fn inferable_jump_target(&self) -> Option<i32> {
        match self.opcode? {
            Opcode::jal | Opcode::c_jal | Opcode::c_j => Some(self.operands.imm),
            Opcode::jalr if self.operands.rs1 == ZERO => Some(self.operands.imm),
            _ => None,
        }
    }

    /// Determine the base register and offset of an uninferable jump
    ///
    /// The jump target is computed by adding the offset to the contents of
    /// the returned register.
    pub fn uninferable_jump(&self) -> Option<(Register, i32)> {
        match self.opcode? {
            Opcode::jalr | Opcode::c_jr | Opcode::c_jalr => {
                Some((self.operands.rs1, self.operands.imm))
            }
            _ => None,
        }
        .filter(|(r, _)| *r != ZERO)
    }

    /// Determine the upper immediate
    ///
    /// If this is an `auipc`, `lui` or `c.lui`, this fn returns the register
    /// the immediate is stored to and its effective value after the
    /// instruction retired.
    pub fn upper_immediate(&self) -> Option<(Register, u64)> {
        let base = match self.opcode? {
            Opcode::lui | Opcode::c_lui => 0,
            Opcode::auipc => self.pc,
            _ => return None,
        };
        let value = base.wrapping_add_signed(self.operands.imm.into());
        Some((self.operands.rd, value))
    }

    /// Determine the target of a sequentially inferable jump
    ///
    /// A sequentially inferable jump is an uninferable jump whose base
    /// register was written by the directly preceeding `lui`, `auipc` or
    /// `c.lui` instruction `prev`. Returns the absolute jump target for such a
    /// pair and `None` otherwise.
    pub fn sequential_jump_target(&self, prev: &Self) -> Option<u64> {
        let (reg, offset) = self.uninferable_jump()?;
        let (dest, value) = prev.upper_immediate()?;
        (reg == dest).then(|| value.wrapping_add_signed(offset.into()))
    }

    /// Determine whether this is a conditional branch
    pub fn is_branch(&self) -> bool {
        self.branch_target().is_some()
    }

    /// Determine whether this is a jump with an inferable target
    pub fn is_inferable_jump(&self) -> bool {
        self.inferable_jump_target().is_some()
    }

    /// Determine whether this is a jump with an uninferable target
    pub fn is_uninferable_jump(&self) -> bool {
        self.uninferable_jump().is_some()
    }

    /// Determine whether this instruction returns from a trap
    pub fn is_return_from_trap(&self) -> bool {
        use Opcode::*;

        matches!(self.opcode, Some(uret | sret | mret | dret))
    }

    /// Determine whether this is an uninferable discontinuity
    ///
    /// Uninferable discontinuities are uninferable jumps and returns from
    /// traps. Exceptions raised by `ecall` and `ebreak` are not considered
    /// discontinuities of this kind.
    pub fn is_uninferable_discon(&self) -> bool {
        self.is_uninferable_jump() || self.is_return_from_trap()
    }

    /// Determine whether this instruction is a function call
    ///
    /// Calls are `jal` and `jalr` linking to `ra` as well as `c.jal` and
    /// `c.jalr`.
    pub fn is_call(&self) -> bool {
        match self.opcode {
            Some(Opcode::jal | Opcode::jalr) => self.operands.rd == RA,
            Some(Opcode::c_jal | Opcode::c_jalr) => true,
            _ => false,
        }
    }

    /// Determine whether this instruction is a function return
    ///
    /// Returns are `jalr` with `rd` being `zero` and `rs1` being `ra`, and
    /// `c.jr ra`. The offset is not considered.
    pub fn is_return(&self) -> bool {
        let Operands { rd, rs1, .. } = self.operands;
        match self.opcode {
            Some(Opcode::jalr) => rd == ZERO && rs1 == RA,
            Some(Opcode::c_jr) => rs1 == RA,
            _ => false,
        }
    }
}
