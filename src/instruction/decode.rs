// Copyright (C) 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Instruction decode

use super::base::Set;
use super::bits::Bits;
use super::operands::Operands;
use super::{Instruction, Opcode};

/// Decode for [`Instruction`]s
pub trait Decode {
    /// Decode the [`Instruction`] located at `pc` from its [`Bits`]
    ///
    /// Instructions which are not relevant for control flow or which could not
    /// be decoded are returned without an [`Opcode`].
    fn decode(&self, isa: Set, pc: u64, bits: Bits) -> Instruction;
}

impl<D: Decode + ?Sized> Decode for &D {
    fn decode(&self, isa: Set, pc: u64, bits: Bits) -> Instruction {
        D::decode(self, isa, pc, bits)
    }
}

/// Built-in instruction decoder
///
/// This decoder identifies all instructions of `RV32I`, `RV64I` and the `C`
/// and `Zifencei` extensions relevant for control flow, plus a few system
/// instructions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Disassembler;

impl Disassembler {
    fn decode_32(insn: u32) -> Option<(Opcode, Operands)> {
        let funct3 = (insn >> 12) & 0x7;
        match insn & 0x7f {
            0b1100011 => {
                let opcode = match funct3 {
                    0b000 => Opcode::beq,
                    0b001 => Opcode::bne,
                    0b100 => Opcode::blt,
                    0b101 => Opcode::bge,
                    0b110 => Opcode::bltu,
                    0b111 => Opcode::bgeu,
                    _ => return None,
                };
                Some((opcode, Operands::type_b(insn)))
            }
            0b1101111 => Some((Opcode::jal, Operands::type_j(insn))),
            0b1100111 if funct3 == 0 => Some((Opcode::jalr, Operands::type_i(insn))),
            0b0110111 => Some((Opcode::lui, Operands::type_u(insn))),
            0b0010111 => Some((Opcode::auipc, Operands::type_u(insn))),
            0b0001111 => match funct3 {
                0b000 => Some((Opcode::fence, Default::default())),
                0b001 => Some((Opcode::fence_i, Default::default())),
                _ => None,
            },
            0b1110011 => {
                let opcode = match insn {
                    0x0000_0073 => Opcode::ecall,
                    0x0010_0073 => Opcode::ebreak,
                    0x0020_0073 => Opcode::uret,
                    0x1020_0073 => Opcode::sret,
                    0x3020_0073 => Opcode::mret,
                    0x7b20_0073 => Opcode::dret,
                    0x1050_0073 => Opcode::wfi,
                    i if i >> 25 == 0b0001001 && i & 0x7f80 == 0 => Opcode::sfence_vma,
                    _ => return None,
                };
                Some((opcode, Default::default()))
            }
            _ => None,
        }
    }

    fn decode_16(isa: Set, insn: u16) -> Option<(Opcode, Operands)> {
        let funct3 = insn >> 13;
        let rd = (insn >> 7) & 0x1f;
        let rs2 = (insn >> 2) & 0x1f;
        match (insn & 0x3, funct3) {
            (0b01, 0b001) if isa == Set::Rv32I => {
                Some((Opcode::c_jal, Operands::type_cj(insn).with_rd(1)))
            }
            (0b01, 0b011) if rd != 0 && rd != 2 => {
                let operands = Operands::type_ci_lui(insn);
                (operands.imm != 0).then_some((Opcode::c_lui, operands))
            }
            (0b01, 0b101) => Some((Opcode::c_j, Operands::type_cj(insn))),
            (0b01, 0b110) => Some((Opcode::c_beqz, Operands::type_cb(insn))),
            (0b01, 0b111) => Some((Opcode::c_bnez, Operands::type_cb(insn))),
            (0b10, 0b100) => {
                let bit12 = insn & 0x1000 != 0;
                match (bit12, rd, rs2) {
                    (false, rs1, 0) if rs1 != 0 => {
                        Some((Opcode::c_jr, Operands::type_cr(insn).with_rd(0)))
                    }
                    (true, 0, 0) => Some((Opcode::c_ebreak, Default::default())),
                    (true, rs1, 0) if rs1 != 0 => {
                        Some((Opcode::c_jalr, Operands::type_cr(insn).with_rd(1)))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl Decode for Disassembler {
    fn decode(&self, isa: Set, pc: u64, bits: Bits) -> Instruction {
        let decoded = match bits {
            Bits::Bit16(insn) => Self::decode_16(isa, insn),
            Bits::Bit32(insn) => Self::decode_32(insn),
            Bits::Bit48(_) | Bits::Bit64(_) => None,
        };
        match decoded {
            Some((opcode, operands)) => Instruction::new(pc, bits, opcode, operands),
            None => Instruction::unknown(pc, bits),
        }
    }
}

#[cfg(feature = "riscv-isa")]
impl Decode for riscv_isa::Target {
    fn decode(&self, _isa: Set, pc: u64, bits: Bits) -> Instruction {
        use riscv_isa::Instruction as I;

        let insn = match bits {
            Bits::Bit16(insn) => {
                use riscv_isa::Compressed;

                // Version 0.3.1 of `riscv-isa` wrongly decodes some
                // instructions as `c.lui`, `c.jr` or `c.jalr`.
                match riscv_isa::decode_compressed(insn, self) {
                    Compressed::C_LUI { rd: 0, .. } => Compressed::UNIMP,
                    Compressed::C_JR { rs1: 0, .. } => Compressed::UNIMP,
                    Compressed::C_JALR { rs1: 0, .. } => Compressed::UNIMP,
                    insn => insn,
                }
                .into()
            }
            Bits::Bit32(insn) => riscv_isa::decode_full(insn, self),
            Bits::Bit48(_) | Bits::Bit64(_) => I::UNIMP,
        };

        let branch = |rs1: u32, rs2: u32, offset: i32| Operands {
            rs1: rs1 as u8,
            rs2: rs2 as u8,
            imm: offset,
            ..Default::default()
        };
        let decoded = match insn {
            I::BEQ { rs1, rs2, offset } => Some((Opcode::beq, branch(rs1, rs2, offset as i32))),
            I::BNE { rs1, rs2, offset } => Some((Opcode::bne, branch(rs1, rs2, offset as i32))),
            I::BLT { rs1, rs2, offset } => Some((Opcode::blt, branch(rs1, rs2, offset as i32))),
            I::BGE { rs1, rs2, offset } => Some((Opcode::bge, branch(rs1, rs2, offset as i32))),
            I::BLTU { rs1, rs2, offset } => Some((Opcode::bltu, branch(rs1, rs2, offset as i32))),
            I::BGEU { rs1, rs2, offset } => Some((Opcode::bgeu, branch(rs1, rs2, offset as i32))),
            I::JAL { rd, offset } => Some((
                Opcode::jal,
                Operands {
                    rd: rd as u8,
                    imm: offset as i32,
                    ..Default::default()
                },
            )),
            I::JALR { rd, rs1, offset } => Some((
                Opcode::jalr,
                Operands {
                    rd: rd as u8,
                    rs1: rs1 as u8,
                    imm: offset as i32,
                    ..Default::default()
                },
            )),
            I::LUI { rd, imm } => Some((
                Opcode::lui,
                Operands {
                    rd: rd as u8,
                    imm: (imm as i32) << 12,
                    ..Default::default()
                },
            )),
            I::AUIPC { rd, imm } => Some((
                Opcode::auipc,
                Operands {
                    rd: rd as u8,
                    imm: (imm as i32) << 12,
                    ..Default::default()
                },
            )),
            I::SRET => Some((Opcode::sret, Default::default())),
            I::MRET => Some((Opcode::mret, Default::default())),
            I::ECALL => Some((Opcode::ecall, Default::default())),
            I::EBREAK => Some((Opcode::ebreak, Default::default())),
            _ => None,
        };
        match decoded {
            Some((opcode, operands)) => Instruction::new(pc, bits, opcode, operands),
            None => Instruction::unknown(pc, bits),
        }
    }
}
