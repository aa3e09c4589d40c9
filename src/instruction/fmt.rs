// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Disassembly rendering

use core::fmt;

use super::{Instruction, Opcode};

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Opcode::*;

        let Some(opcode) = self.opcode else {
            return write!(f, ".insn {}", self.bits);
        };
        let name = opcode.name();
        let ops = self.operands;
        match opcode {
            beq | bne | blt | bge | bltu | bgeu => {
                write!(f, "{name} x{}, x{}, {}", ops.rs1, ops.rs2, ops.imm)
            }
            c_beqz | c_bnez => write!(f, "{name} x{}, {}", ops.rs1, ops.imm),
            jal => write!(f, "{name} x{}, {}", ops.rd, ops.imm),
            c_j | c_jal => write!(f, "{name} {}", ops.imm),
            jalr => write!(f, "{name} x{}, {}(x{})", ops.rd, ops.imm, ops.rs1),
            c_jr | c_jalr => write!(f, "{name} x{}", ops.rs1),
            lui | auipc | c_lui => write!(f, "{name} x{}, {:#x}", ops.rd, (ops.imm as u32) >> 12),
            _ => f.write_str(name),
        }
    }
}
