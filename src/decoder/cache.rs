// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Cache for decoded [`Instruction`]s

use core::fmt;

use crate::binary::Binary;
use crate::instruction::base;
use crate::instruction::bits::Bits;
use crate::instruction::decode::Decode;
use crate::instruction::{Instruction, Size};

use super::error::Error;

/// Direct-mapped cache for decoded [`Instruction`]s
///
/// The cache holds `N` slots. An instruction at a given address may only
/// reside in slot `address % N`. In addition, the most recently resolved
/// instruction is kept separately, since it is usually requested again right
/// away.
#[derive(Clone, Debug)]
pub struct Cache<const N: usize> {
    slots: [Option<Instruction>; N],
    last: Option<Instruction>,
    stats: Statistics,
}

impl<const N: usize> Cache<N> {
    /// Resolve the [`Instruction`] at the given address
    ///
    /// The instruction is taken from the cache if present. Otherwise, its
    /// [`Bits`] are fetched from the [`Binary`] and decoded. Only 16 and 32 bit
    /// instructions are accepted.
    pub fn resolve<B: Binary, D: Decode>(
        &mut self,
        address: u64,
        binary: &mut B,
        decode: &D,
        isa: base::Set,
    ) -> Result<Instruction, Error<B::Error>> {
        self.stats.gets += 1;

        if let Some(insn) = self.last.filter(|i| i.pc == address) {
            self.stats.same += 1;
            return Ok(insn);
        }

        if let Some(insn) = self.slot_mut(address).filter(|i| i.pc == address) {
            self.stats.hits += 1;
            self.last = Some(insn);
            return Ok(insn);
        }

        let bits = binary
            .get_bits(address)
            .map_err(|source| Error::CannotGetInstruction { source, address })?;
        if !matches!(bits.size(), Size::Compressed | Size::Normal) {
            return Err(Error::UnsupportedLength { address, bits });
        }
        let insn = decode.decode(isa, address, bits);
        *self.slot_mut(address) = Some(insn);
        self.last = Some(insn);
        Ok(insn)
    }

    /// Forget all cached instructions
    ///
    /// Statistics are not affected.
    pub fn invalidate(&mut self) {
        self.slots = [None; N];
        self.last = None;
    }

    /// Retrieve the [`Statistics`] of this cache
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    fn slot_mut(&mut self, address: u64) -> &mut Option<Instruction> {
        // `N` fits a `usize`, so the remainder does
        let index = (address % N as u64) as usize;
        &mut self.slots[index]
    }
}

impl<const N: usize> Default for Cache<N> {
    fn default() -> Self {
        const { assert!(N > 0, "A cache needs at least one slot") };
        Self {
            slots: [None; N],
            last: None,
            stats: Default::default(),
        }
    }
}

/// Cache statistics
///
/// The [`Display`][fmt::Display] impl renders a short, human readable report.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of instructions requested
    pub gets: u64,
    /// Number of requests served by the slots
    pub hits: u64,
    /// Number of requests for the most recently resolved instruction
    pub same: u64,
}

impl Statistics {
    fn percentage(&self, count: u64) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.gets as f64
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let same = self.percentage(self.same);
        let hits = self.percentage(self.hits);
        write!(
            f,
            "decoded-cache: same = {:7} ({same:5.2}%), hits = {:8} ({hits:5.2}%), total = {:8}, combined hit-rate = {:.2}%",
            self.same,
            self.hits,
            self.gets,
            same + hits,
        )
    }
}
