// Copyright (C) 2024, 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Execution path replay
//!
//! This module provides the [`Decoder`], which processes [`InstructionTrace`]
//! packets and [`Support`] messages for a single RISC-V hart and reports the
//! sequence of retired instructions to a [`Retire`] sink.
//!
//! A [`Decoder`] is created via a [`Builder`], which is obtained through
//! [`builder`]. Packets are fed to the decoder one at a time through
//! [`process_te_inst`][Decoder::process_te_inst]. Every instruction replayed
//! as part of processing a packet is reported to the sink before the call
//! returns.
//!
//! # Example
//!
//! ```
//! use riscv_te_replay::{binary, config, decoder, packet};
//! use riscv_te_replay::binary::Binary;
//!
//! // addi a0,a0,1
//! let code = b"\x13\x05\x15\x00";
//!
//! let mut retired = Vec::new();
//! let mut decoder = decoder::builder()
//!     .with_capabilities(&config::Capabilities::default())
//!     .with_binary(binary::from_segment(code).with_offset(0x1000))
//!     .with_sink(decoder::from_fn(|_, pc, insn| retired.push((pc, insn.to_string()))))
//!     .build();
//!
//! let sync = packet::Synchronization {
//!     address: 0x1000,
//!     ..Default::default()
//! };
//! decoder.process_te_inst(&sync.into()).unwrap();
//! assert_eq!(decoder.state().instruction_count, 1);
//! drop(decoder);
//!
//! assert_eq!(retired, [(0x1000, String::from(".insn 00150513"))]);
//! ```

pub mod cache;
pub mod error;
pub mod retire;
mod state;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use retire::{Retire, Retirement, from_fn};
pub use state::{AddressMatch, State};

use crate::binary::{self, Binary};
use crate::config::{AddressMode, Capabilities};
use crate::instruction::base;
use crate::instruction::decode::{Decode, Disassembler};
use crate::packet::{InstructionTrace, QualStatus, Subformat, Support, Synchronization};
use crate::types::branch;

use cache::{Cache, Statistics};
use state::Target;

/// Sentinel for addresses not known yet
pub const NO_ADDRESS: u64 = 0xbadadd;

/// Default number of slots of the [`Decoder`]'s instruction cache
pub const DEFAULT_CACHE_SLOTS: usize = 256;

/// Decoder
///
/// A decoder replays the execution path of a single RISC-V hart based on
/// [`InstructionTrace`] packets and reports retired instructions to a sink of
/// type `R`. Instructions are fetched from a [`Binary`] of type `B` and decoded
/// via `D`. Decoded instructions are kept in a [`Cache`] of `N` slots.
pub struct Decoder<B, R = (), D = Disassembler, const N: usize = DEFAULT_CACHE_SLOTS> {
    state: State,
    cache: Cache<N>,
    binary: B,
    sink: R,
    decode: D,
    capabilities: Capabilities,
    isa: base::Set,
}

impl<B, R, D, const N: usize> Decoder<B, R, D, N>
where
    B: Binary,
    R: Retire,
    D: Decode,
{
    /// Process an [`InstructionTrace`] packet
    ///
    /// All instructions retired up to the point reported by the packet are
    /// reported to the sink before this fn returns. The first packet after
    /// construction, a [`reset`][Self::reset] or the end of qualification
    /// must be a [`Synchronization`].
    pub fn process_te_inst(&mut self, packet: &InstructionTrace) -> Result<(), Error<B::Error>> {
        log::debug!("Processing {packet}");

        if let InstructionTrace::Synchronization(sync) = packet {
            return self.process_sync(sync);
        }

        if self.state.start_of_trace {
            return Err(Error::StartOfTrace);
        }

        // Format 0 carries nothing we make use of, but still replays toward
        // the last known address
        let branch = match packet {
            InstructionTrace::Branch(branch) => Some(branch),
            _ => None,
        };

        let info = packet.get_address_info();
        // A full branch map does not report an address
        let reports_address = branch.is_none_or(|b| b.branches != 0);
        if let Some(info) = info.filter(|_| reports_address) {
            self.state.stop_at_last_branch = false;
            let address = self.capabilities.expand_address(info.address as u64);
            self.state.address = match self.capabilities.address_mode() {
                AddressMode::Full => address,
                AddressMode::Delta => self.state.address.wrapping_add(address),
            };
        }

        if let Some(branch) = branch {
            self.state.stop_at_last_branch = branch.branches == 0;
            let count = if branch.branches == 0 {
                branch::Map::FULL_PACKET_BRANCHES
            } else {
                branch.branches
            };
            let map = branch::Map::new(count, branch.branch_map.into())?;
            self.state.branch_map.append(map)?;
        }

        let updiscon = info.is_some_and(|i| i.updiscon);
        self.follow_execution_path(Target::Packet { updiscon })
    }

    /// Process a [`Support`] message
    ///
    /// After the end of qualification, the decoder expects a
    /// [`Synchronization`] before any other packet.
    pub fn process_support(&mut self, support: &Support) -> Result<(), Error<B::Error>> {
        log::debug!("Processing {support}");

        if support.support_type != 0 {
            return Ok(());
        }

        match support.qual_status {
            QualStatus::NoChange => (),
            QualStatus::TraceLost => log::warn!("Trace lost at {:#x}", self.state.pc),
            QualStatus::EndedRep => self.state.start_of_trace = true,
            QualStatus::EndedNtr => {
                self.state.start_of_trace = true;
                // The last reported address is final
                self.resolve_address_match()?;
            }
        }
        Ok(())
    }

    /// Reset the decoder to its initial state
    ///
    /// Both the replay [`State`] and the instruction cache are reset. The
    /// decoder will expect a [`Synchronization`] as the next packet.
    pub fn reset(&mut self) {
        self.state = State::new(self.capabilities.return_stack_depth());
        self.cache = Default::default();
    }

    /// Retrieve the current replay [`State`]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Retrieve the instruction cache's [`Statistics`]
    pub fn statistics(&self) -> &Statistics {
        self.cache.statistics()
    }

    /// Retrieve the [`Capabilities`] this decoder was built for
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Retrieve the sink
    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Retrieve the sink mutably
    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    /// Retrieve the [`Binary`]
    pub fn binary(&self) -> &B {
        &self.binary
    }

    /// Consume the decoder, returning the sink
    pub fn into_sink(self) -> R {
        self.sink
    }

    /// Process a [`Synchronization`]
    fn process_sync(&mut self, sync: &Synchronization) -> Result<(), Error<B::Error>> {
        self.state.address_match = AddressMatch::Matching;
        self.state.address = self.capabilities.expand_address(sync.address);

        if sync.subformat == Subformat::Trap || self.state.start_of_trace {
            self.state.branch_map.clear();
        }
        if self.get_insn(self.state.address)?.is_branch() {
            self.state.branch_map.push_branch_taken(!sync.branch)?;
        }

        if sync.subformat == Subformat::Start && !self.state.start_of_trace {
            self.follow_execution_path(Target::Sync)?;
        } else {
            self.state.last_pc = self.state.pc;
            self.state.pc = self.state.address;
            self.retire()?;
            self.state.last_pc = self.state.pc;
        }

        self.state.start_of_trace = false;
        self.state.return_stack.clear();
        Ok(())
    }
}

/// Create a new [`Builder`] for [`Decoder`]s
pub fn builder() -> Builder<binary::Empty> {
    Default::default()
}

/// Builder for [`Decoder`]
///
/// A builder will build a single [`Decoder`] for a single RISC-V hart. If
/// multiple harts are to be traced, multiple [`Decoder`]s need to be built.
/// For this purpose, [`Builder`] implements [`Copy`] and [`Clone`] as long as
/// its parts do.
#[derive(Copy, Clone, Debug, Default)]
pub struct Builder<B = binary::Empty, R = (), D = Disassembler> {
    binary: B,
    sink: R,
    decode: D,
    capabilities: Capabilities,
    isa: base::Set,
}

impl Builder<binary::Empty> {
    /// Create a new builder for a [`Decoder`]
    pub fn new() -> Self {
        Default::default()
    }
}

impl<B, R, D> Builder<B, R, D> {
    /// Build the [`Decoder`] for an encoder with the given [`Capabilities`]
    ///
    /// New builders assume [`Default`] capabilities. This is usually not what
    /// you want.
    pub fn with_capabilities(self, capabilities: &Capabilities) -> Self {
        Self {
            capabilities: *capabilities,
            ..self
        }
    }

    /// Build the [`Decoder`] with the given [`Binary`]
    ///
    /// New builders carry an [empty][binary::Empty] [`Binary`].
    pub fn with_binary<C>(self, binary: C) -> Builder<C, R, D> {
        Builder {
            binary,
            sink: self.sink,
            decode: self.decode,
            capabilities: self.capabilities,
            isa: self.isa,
        }
    }

    /// Build the [`Decoder`] with the given [`Retire`] sink
    ///
    /// New builders discard all retirements.
    pub fn with_sink<S>(self, sink: S) -> Builder<B, S, D> {
        Builder {
            binary: self.binary,
            sink,
            decode: self.decode,
            capabilities: self.capabilities,
            isa: self.isa,
        }
    }

    /// Build the [`Decoder`] with the given [`Decode`] impl
    ///
    /// New builders use the built-in [`Disassembler`].
    pub fn with_decode<E>(self, decode: E) -> Builder<B, R, E> {
        Builder {
            binary: self.binary,
            sink: self.sink,
            decode,
            capabilities: self.capabilities,
            isa: self.isa,
        }
    }

    /// Build the [`Decoder`] for the given base instruction set
    ///
    /// New builders are configured for [`base::Set::Rv32I`].
    pub fn with_isa(self, isa: base::Set) -> Self {
        Self { isa, ..self }
    }

    /// Build the [`Decoder`] with a cache of [`DEFAULT_CACHE_SLOTS`] slots
    pub fn build(self) -> Decoder<B, R, D> {
        self.build_with_cache()
    }

    /// Build the [`Decoder`] with a cache of `N` slots
    pub fn build_with_cache<const N: usize>(self) -> Decoder<B, R, D, N> {
        Decoder {
            state: State::new(self.capabilities.return_stack_depth()),
            cache: Default::default(),
            binary: self.binary,
            sink: self.sink,
            decode: self.decode,
            capabilities: self.capabilities,
            isa: self.isa,
        }
    }
}
