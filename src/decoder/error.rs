// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Replay specific errors

use crate::instruction::Instruction;
use crate::instruction::bits::Bits;
use crate::types::branch;

/// Replay specific errors
///
/// All of these errors are terminal for the current packet stream. Variants
/// carrying an [`Instruction`] identify the instruction (address and
/// disassembly) at which replay failed. It is up to the caller whether to
/// abandon the stream or to [`reset`][super::Decoder::reset] the decoder and
/// wait for the next synchronization.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// Invalid input at start of trace
    ///
    /// The decoder requires a synchronization packet as the first packet.
    #[error("Expecting trace to start with a format 3 packet")]
    StartOfTrace,
    /// The decoder cannot resolve some branch
    ///
    /// The decoder has exhausted all available branch information.
    #[error("Cannot resolve branch at {pc:#x} ({0})", pc = .0.pc)]
    UnresolvableBranch(Instruction),
    /// An unexpected uninferable discontinuity was encountered
    ///
    /// The current packet reported a full branch map without an address, which
    /// does not allow following an uninferable discontinuity.
    #[error("Unexpected uninferable discontinuity at {pc:#x} ({0})", pc = .0.pc)]
    UnexpectedUninferableDiscon(Instruction),
    /// The branch map was exhausted while replaying up to the last branch
    #[error("Branch map exhausted while stopping at last branch at {pc:#x} ({0})", pc = .0.pc)]
    BranchMapExhausted(Instruction),
    /// Unprocessed branches left
    ///
    /// The reported address was reached following an uninferable
    /// discontinuity, but some branches which should have been processed are
    /// still unprocessed.
    #[error("{count} unprocessed branches at {pc:#x} ({insn})", pc = .insn.pc)]
    UnprocessedBranches {
        /// Number of unprocessed branches
        count: u8,
        /// The instruction at the reported address
        insn: Instruction,
    },
    /// An instruction of a length other than 16 or 32 bits was encountered
    #[error("Unsupported instruction {bits} at {address:#x}")]
    UnsupportedLength {
        /// Address of the instruction
        address: u64,
        /// Raw bits of the instruction
        bits: Bits,
    },
    /// Adding branches would exceed the capacity of the branch map
    #[error("Cannot add branches")]
    TooManyBranches(#[from] branch::Error),
    /// We could not fetch an instruction from a given address
    #[error("Cannot get the instruction at {address:#x}")]
    CannotGetInstruction {
        /// Error returned by the [`Binary`][crate::binary::Binary]
        #[source]
        source: E,
        /// Address of the instruction
        address: u64,
    },
}

impl<E> Error<E> {
    /// Retrieve the [`Instruction`] at which replay failed, if known
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            Self::UnresolvableBranch(insn)
            | Self::UnexpectedUninferableDiscon(insn)
            | Self::BranchMapExhausted(insn)
            | Self::UnprocessedBranches { insn, .. } => Some(insn),
            _ => None,
        }
    }
}
