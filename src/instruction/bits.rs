// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Utilities for dissecting a bunch of bytes into instruction [`Bits`]

use core::fmt;

use super::Size;

/// Raw bits of a single encoded instruction
///
/// This is what a [`Binary`][crate::binary::Binary] delivers for an address.
/// The variant reflects the instruction's length as given by its encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Bits {
    Bit16(u16),
    Bit32(u32),
    Bit48(u64),
    Bit64(u64),
}

impl Bits {
    /// Extract [`Bits`] from the beginning of a little endian byte slice
    ///
    /// The length is determined by the Base Instruction-Length Encoding
    /// specified in Section 1.5 of The RISC-V Instruction Set Manual Volume I.
    /// Returns the [`Bits`] and the remainder of the slice, or `None` if the
    /// slice is too short or the encoding denotes an instruction longer than
    /// 64 bits.
    pub fn extract(data: &[u8]) -> Option<(Self, &[u8])> {
        let len = Self::encoded_len(*data.first()?)?;
        let (insn, rest) = data.split_at_checked(len)?;

        let mut raw = [0u8; 8];
        raw[..len].copy_from_slice(insn);
        let raw = u64::from_le_bytes(raw);

        let bits = match len {
            2 => Self::Bit16(raw as u16),
            4 => Self::Bit32(raw as u32),
            6 => Self::Bit48(raw),
            _ => Self::Bit64(raw),
        };
        Some((bits, rest))
    }

    /// Determine an encoded instruction's length from its lowest byte
    fn encoded_len(low: u8) -> Option<usize> {
        if low & 0b11 != 0b11 {
            Some(2)
        } else if low & 0b11100 != 0b11100 {
            Some(4)
        } else if low & 0x3f == 0x1f {
            Some(6)
        } else if low & 0x7f == 0x3f {
            Some(8)
        } else {
            None
        }
    }

    /// Retrieve this instruction's [`Size`]
    pub fn size(self) -> Size {
        match self {
            Self::Bit16(_) => Size::Compressed,
            Self::Bit32(_) => Size::Normal,
            Self::Bit48(_) => Size::Wide,
            Self::Bit64(_) => Size::ExtraWide,
        }
    }

    /// Retrieve the raw value, zero extended
    pub fn raw(self) -> u64 {
        match self {
            Self::Bit16(v) => v.into(),
            Self::Bit32(v) => v.into(),
            Self::Bit48(v) | Self::Bit64(v) => v,
        }
    }
}

impl Default for Bits {
    fn default() -> Self {
        Self::Bit32(0)
    }
}

impl From<u16> for Bits {
    fn from(num: u16) -> Self {
        Self::Bit16(num)
    }
}

impl From<u32> for Bits {
    fn from(num: u32) -> Self {
        Self::Bit32(num)
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bit16(v) => write!(f, "{v:04x}"),
            Self::Bit32(v) => write!(f, "{v:08x}"),
            Self::Bit48(v) => write!(f, "{v:012x}"),
            Self::Bit64(v) => write!(f, "{v:016x}"),
        }
    }
}
