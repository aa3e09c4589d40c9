// Copyright (C) 2024, 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Decoded instructions
//!
//! This module defines the [`Instruction`] the decoder operates on, together
//! with the means of obtaining one from raw [`Bits`][bits::Bits] through a
//! [`Decode`][decode::Decode] implementation. Only instructions relevant for
//! control flow are identified by an [`Opcode`]. All other instructions are
//! only known by their [`Size`].

pub mod base;
pub mod bits;
pub mod decode;
pub mod operands;

mod classify;
mod fmt;


use bits::Bits;
use operands::Operands;

/// Size of an encoded instruction in bytes
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Size {
    Compressed = 2,
    #[default]
    Normal = 4,
    Wide = 6,
    ExtraWide = 8,
}

impl From<Size> for u64 {
    fn from(size: Size) -> Self {
        size as u64
    }
}

/// Control flow relevant instructions the decoder needs to tell apart
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // B
    beq,
    bne,
    blt,
    bge,
    bltu,
    bgeu,
    // CB
    c_beqz,
    c_bnez,
    // J
    jal,
    // I
    jalr,
    // CJ
    c_j,
    c_jal,
    // CR
    c_jr,
    c_jalr,
    // U
    lui,
    auipc,
    // CI
    c_lui,
    // SYS
    uret,
    sret,
    mret,
    dret,
    ecall,
    ebreak,
    c_ebreak,
    fence,
    fence_i,
    wfi,
    sfence_vma,
}

impl Opcode {
    /// Retrieve the assembler mnemonic
    pub fn name(self) -> &'static str {
        match self {
            Self::beq => "beq",
            Self::bne => "bne",
            Self::blt => "blt",
            Self::bge => "bge",
            Self::bltu => "bltu",
            Self::bgeu => "bgeu",
            Self::c_beqz => "c.beqz",
            Self::c_bnez => "c.bnez",
            Self::jal => "jal",
            Self::jalr => "jalr",
            Self::c_j => "c.j",
            Self::c_jal => "c.jal",
            Self::c_jr => "c.jr",
            Self::c_jalr => "c.jalr",
            Self::lui => "lui",
            Self::auipc => "auipc",
            Self::c_lui => "c.lui",
            Self::uret => "uret",
            Self::sret => "sret",
            Self::mret => "mret",
            Self::dret => "dret",
            Self::ecall => "ecall",
            Self::ebreak => "ebreak",
            Self::c_ebreak => "c.ebreak",
            Self::fence => "fence",
            Self::fence_i => "fence.i",
            Self::wfi => "wfi",
            Self::sfence_vma => "sfence.vma",
        }
    }
}

/// A single decoded instruction
///
/// An [`Instruction`] knows its own address, its size and, if it is relevant
/// for control flow, its [`Opcode`] and [`Operands`]. The raw [`Bits`] are
/// kept for rendering unknown instructions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the instruction
    pub pc: u64,
    /// Size of the instruction
    pub size: Size,
    /// The instruction's [`Opcode`], if it is control flow relevant
    pub opcode: Option<Opcode>,
    /// Operands, only meaningful if an [`Opcode`] is present
    pub operands: Operands,
    /// Raw bits the instruction was decoded from
    pub bits: Bits,
}

impl Instruction {
    /// Create an [`Instruction`] not identified as any [`Opcode`]
    pub fn unknown(pc: u64, bits: Bits) -> Self {
        Self {
            pc,
            size: bits.size(),
            opcode: None,
            operands: Default::default(),
            bits,
        }
    }

    /// Create an [`Instruction`] with the given [`Opcode`] and [`Operands`]
    pub fn new(pc: u64, bits: Bits, opcode: Opcode, operands: Operands) -> Self {
        Self {
            opcode: Some(opcode),
            operands,
            ..Self::unknown(pc, bits)
        }
    }

    /// Retrieve the address of the instruction following this one
    pub fn next_pc(&self) -> u64 {
        self.pc.wrapping_add(self.size.into())
    }
}
