// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Sinks for retired instructions

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::instruction::Instruction;

/// Sink for retired instructions
///
/// A [`Decoder`][super::Decoder] reports every instruction it replays to its
/// sink, in retirement order, via [`retire`][Self::retire].
pub trait Retire {
    /// Report a retired instruction
    ///
    /// `last_pc` is the address of the previously reported instruction, or
    /// [`NO_ADDRESS`][super::NO_ADDRESS] for the very first one. `pc` is the
    /// address of the instruction `insn` retired now.
    fn retire(&mut self, last_pc: u64, pc: u64, insn: &Instruction);
}

/// Discard all retirements
impl Retire for () {
    fn retire(&mut self, _: u64, _: u64, _: &Instruction) {}
}

impl<R: Retire + ?Sized> Retire for &mut R {
    fn retire(&mut self, last_pc: u64, pc: u64, insn: &Instruction) {
        R::retire(self, last_pc, pc, insn)
    }
}

/// [`Retire`] adapter for an [`FnMut`]
#[derive(Copy, Clone, Default, Debug)]
pub struct Func<F: FnMut(u64, u64, &Instruction)> {
    func: F,
}

impl<F: FnMut(u64, u64, &Instruction)> Retire for Func<F> {
    fn retire(&mut self, last_pc: u64, pc: u64, insn: &Instruction) {
        (self.func)(last_pc, pc, insn)
    }
}

/// Create a [`Func`] [`Retire`] sink from an [`FnMut`]
///
/// The fn receives the previous address, the current address and the
/// [`Instruction`] at the current address.
pub fn from_fn<F: FnMut(u64, u64, &Instruction)>(func: F) -> Func<F> {
    Func { func }
}

/// A single retirement, as recorded by a [`Vec`] sink
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Retirement {
    /// Address of the previously retired instruction
    pub last_pc: u64,
    /// Address of the retired instruction
    pub pc: u64,
    /// The retired instruction
    pub insn: Instruction,
}

#[cfg(any(test, feature = "alloc"))]
impl Retire for Vec<Retirement> {
    fn retire(&mut self, last_pc: u64, pc: u64, insn: &Instruction) {
        self.push(Retirement {
            last_pc,
            pc,
            insn: *insn,
        })
    }
}
