// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Base instruction set
//!
//! This module provides definitions for representing RISC-V base instruction
//! set variants such as `RV32I`.

/// RISC-V base instruction set variant
///
/// The RISC-V specification(s) define a small set of base instruction sets,
/// such as `RV32I`, and various extensions (such as `M` or `C`). An encoding
/// of any given instruction does not differ between sets of extensions
/// supported, but it may differ between base instruction sets. For example,
/// the encoding of `c.jal` in `RV32C` denotes `c.addiw` in `RV64C`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Set {
    #[default]
    Rv32I,
    Rv64I,
}

impl Set {
    /// Retrieve the width of general purpose registers in bits
    pub fn xlen(self) -> u8 {
        match self {
            Self::Rv32I => 32,
            Self::Rv64I => 64,
        }
    }
}
