// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Instruction operands
//!
//! This module extracts register and immediate fields from encoded
//! instructions as defined by The RISC-V Instruction Set Manual Volume I
//! [^spec], sections 2.2 Base Instruction Formats, 2.3 Immediate Encoding
//! Variants and 26.2 Compressed Instruction Formats.
//!
//! Immediates are extracted as the value they denote rather than the bit
//! pattern present in the encoding. For example, a B-type immediate is always
//! a multiple of two and a U-type immediate has its lower 12 bits cleared.
//!
//! [^spec]: found here: <https://riscv.org/specifications/ratified/>

/// Register number
pub type Register = u8;

/// The zero register `x0`
pub const ZERO: Register = 0;

/// The return address register `x1` (`ra`)
pub const RA: Register = 1;

/// Operands of a decoded instruction
///
/// Fields not present in an instruction's encoding are zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Operands {
    /// Destination register
    pub rd: Register,
    /// Source register 1
    pub rs1: Register,
    /// Source register 2
    pub rs2: Register,
    /// Sign-extended immediate
    pub imm: i32,
}

impl Operands {
    /// Extract the operands of an I-type instruction
    pub fn type_i(insn: u32) -> Self {
        Self {
            rd: rd(insn),
            rs1: rs1(insn),
            imm: (insn as i32) >> 20,
            ..Default::default()
        }
    }

    /// Extract the operands of a B-type instruction
    pub fn type_b(insn: u32) -> Self {
        let imm = ((insn >> 7) & 0x001e)
            | ((insn >> 20) & 0x07e0)
            | ((insn << 4) & 0x0800)
            | ((insn >> 19) & 0x1000);
        Self {
            rs1: rs1(insn),
            rs2: rs2(insn),
            imm: sign_extend(imm, 12),
            ..Default::default()
        }
    }

    /// Extract the operands of a U-type instruction
    pub fn type_u(insn: u32) -> Self {
        Self {
            rd: rd(insn),
            imm: (insn & 0xffff_f000) as i32,
            ..Default::default()
        }
    }

    /// Extract the operands of a J-type instruction
    pub fn type_j(insn: u32) -> Self {
        let imm = ((insn >> 20) & 0x0007fe)
            | ((insn >> 9) & 0x000800)
            | (insn & 0x0ff000)
            | ((insn >> 11) & 0x100000);
        Self {
            rd: rd(insn),
            imm: sign_extend(imm, 20),
            ..Default::default()
        }
    }

    /// Extract the operands of a CR-type instruction
    ///
    /// The register in bits 11 to 7 is both `rd` and `rs1` in this format.
    pub fn type_cr(insn: u16) -> Self {
        let insn = u32::from(insn);
        Self {
            rd: rd(insn),
            rs1: rd(insn),
            rs2: ((insn >> 2) & 0x1f) as Register,
            imm: 0,
        }
    }

    /// Extract the operands of a `c.lui` (CI-type) instruction
    pub fn type_ci_lui(insn: u16) -> Self {
        let insn = u32::from(insn);
        let imm = ((insn << 10) & 0x1_f000) | ((insn << 5) & 0x2_0000);
        Self {
            rd: rd(insn),
            imm: sign_extend(imm, 17),
            ..Default::default()
        }
    }

    /// Extract the operands of a CB-type branch instruction
    pub fn type_cb(insn: u16) -> Self {
        let insn = u32::from(insn);
        let imm = ((insn >> 2) & 0x006)
            | ((insn >> 7) & 0x018)
            | ((insn << 3) & 0x020)
            | ((insn << 1) & 0x0c0)
            | ((insn >> 4) & 0x100);
        Self {
            rs1: (((insn >> 7) & 0x7) | 0x8) as Register,
            imm: sign_extend(imm, 8),
            ..Default::default()
        }
    }

    /// Extract the operands of a CJ-type instruction
    pub fn type_cj(insn: u16) -> Self {
        let insn = u32::from(insn);
        let imm = ((insn >> 2) & 0x00e)
            | ((insn >> 7) & 0x010)
            | ((insn << 3) & 0x020)
            | ((insn >> 1) & 0x040)
            | ((insn << 1) & 0x080)
            | ((insn >> 1) & 0x300)
            | ((insn << 2) & 0x400)
            | ((insn >> 1) & 0x800);
        Self {
            imm: sign_extend(imm, 11),
            ..Default::default()
        }
    }

    /// Set the destination register
    pub fn with_rd(self, rd: Register) -> Self {
        Self { rd, ..self }
    }
}

const fn rd(insn: u32) -> Register {
    ((insn >> 7) & 0x1f) as Register
}

const fn rs1(insn: u32) -> Register {
    ((insn >> 15) & 0x1f) as Register
}

const fn rs2(insn: u32) -> Register {
    ((insn >> 20) & 0x1f) as Register
}

/// Sign extend `value` from the bit at position `sign`
const fn sign_extend(value: u32, sign: u32) -> i32 {
    let shift = 31 - sign;
    ((value << shift) as i32) >> shift
}
