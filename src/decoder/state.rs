// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Execution path replay

use crate::binary::Binary;
use crate::instruction::Instruction;
use crate::instruction::decode::Decode;
use crate::types::{branch, stack::ReturnStack};

use super::error::Error;
use super::retire::Retire;
use super::{Decoder, NO_ADDRESS};

/// Replay state of a single hart
#[derive(Clone, Debug)]
pub struct State {
    /// Address of the instruction retired last
    pub pc: u64,
    /// Address of the instruction retired before the one at `pc`
    pub last_pc: u64,
    /// Address reconstructed from the latest packet
    pub address: u64,
    /// Branches reported but not yet replayed
    pub branch_map: branch::Map,
    /// Return addresses of calls not yet returned from
    pub return_stack: ReturnStack,
    /// No synchronization was seen since the start or end of trace
    pub start_of_trace: bool,
    /// The current packet reported a full branch map without an address
    pub stop_at_last_branch: bool,
    /// Progress of matching the reported address
    pub address_match: AddressMatch,
    /// Number of instructions retired
    pub instruction_count: u64,
}

impl State {
    /// Create a new, initial state for a return stack of the given depth
    pub fn new(return_stack_depth: usize) -> Self {
        Self {
            pc: NO_ADDRESS,
            last_pc: NO_ADDRESS,
            address: NO_ADDRESS,
            branch_map: Default::default(),
            return_stack: ReturnStack::new(return_stack_depth),
            start_of_trace: true,
            stop_at_last_branch: false,
            address_match: Default::default(),
            instruction_count: 0,
        }
    }
}

/// Progress of matching a reported address
///
/// When a packet's address is reached without an uninferable discontinuity
/// preceeding it, the instruction at that address may be executed again
/// before the instruction actually reported retires. For example, the
/// address may be part of a loop. In that case, replay stops at the first
/// occurrence but remembers the address. The next packet will then replay up
/// to the address' second occurrence before following the path towards its
/// own address.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AddressMatch {
    /// The reported address is matched exactly
    #[default]
    Matching,
    /// The address was reached once and may be reached again
    AwaitingSecondHit(u64),
}

/// Kind of packet replay is performed for
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Target {
    /// Synchronization packet
    Sync,
    /// Format 1 or 2 packet, with or without address
    Packet {
        /// The packet's address follows an uninferable discontinuity
        updiscon: bool,
    },
}

impl<B, R, D, const N: usize> Decoder<B, R, D, N>
where
    B: Binary,
    R: Retire,
    D: Decode,
{
    /// Resolve the [`Instruction`] at the given address
    pub(super) fn get_insn(&mut self, address: u64) -> Result<Instruction, Error<B::Error>> {
        self.cache
            .resolve(address, &mut self.binary, &self.decode, self.isa)
    }

    /// Report the instruction at the current `pc` to the sink
    pub(super) fn retire(&mut self) -> Result<(), Error<B::Error>> {
        let State { last_pc, pc, .. } = self.state;
        let insn = self.get_insn(pc)?;
        log::trace!(
            "{}{last_pc:#010x} -> {pc:#010x}: {insn}\t{}",
            if pc == self.state.address { "----> " } else { "" },
            self.state.instruction_count,
        );
        self.sink.retire(last_pc, pc, &insn);
        self.state.instruction_count += 1;
        Ok(())
    }

    /// Advance to the next instruction
    ///
    /// Determines the address of the instruction retiring after the one at
    /// `pc`. `address` is taken as the target of an uninferable
    /// discontinuity.
    pub(super) fn next_pc(&mut self, address: u64) -> Result<(), Error<B::Error>> {
        let this_pc = self.state.pc;
        let insn = self.get_insn(this_pc)?;

        let pc = if let Some(offset) = insn.inferable_jump_target() {
            this_pc.wrapping_add_signed(offset.into())
        } else if let Some(target) = self.sequential_jump_target(&insn)? {
            target
        } else if let Some(link) = self.implicit_return(&insn) {
            link
        } else if insn.is_uninferable_discon() {
            if self.state.stop_at_last_branch {
                return Err(Error::UnexpectedUninferableDiscon(insn));
            }
            address
        } else if let Some(offset) = insn.branch_target() {
            let taken = self
                .state
                .branch_map
                .pop_taken()
                .ok_or(Error::UnresolvableBranch(insn))?;
            if taken {
                this_pc.wrapping_add_signed(offset.into())
            } else {
                insn.next_pc()
            }
        } else {
            insn.next_pc()
        };

        if insn.is_call() {
            self.state.return_stack.push(insn.next_pc());
        }

        self.state.last_pc = this_pc;
        self.state.pc = pc;
        self.retire()
    }

    /// Determine the target of a sequentially inferable jump at `pc`
    fn sequential_jump_target(
        &mut self,
        insn: &Instruction,
    ) -> Result<Option<u64>, Error<B::Error>> {
        let last_pc = self.state.last_pc;
        if !insn.is_uninferable_jump() || last_pc == NO_ADDRESS {
            return Ok(None);
        }
        let prev = self.get_insn(last_pc)?;
        Ok(insn.sequential_jump_target(&prev))
    }

    /// Pop the return address if `insn` is an implicit return
    fn implicit_return(&mut self, insn: &Instruction) -> Option<u64> {
        if self.capabilities.implicit_return && insn.is_return() {
            self.state.return_stack.pop()
        } else {
            None
        }
    }

    /// Follow the execution path to the current packet's address
    pub(super) fn follow_execution_path(&mut self, target: Target) -> Result<(), Error<B::Error>> {
        let address = self.state.address;
        log::debug!(
            "Following execution path from {:#x} to {address:#x} ({target:?}, {} branches)",
            self.state.pc,
            self.state.branch_map.count(),
        );

        loop {
            if self.state.stop_at_last_branch && self.state.branch_map.is_empty() {
                let insn = self.get_insn(self.state.pc)?;
                return Err(Error::BranchMapExhausted(insn));
            }

            if let AddressMatch::AwaitingSecondHit(previous) = self.state.address_match {
                self.next_pc(previous)?;
                if self.state.pc == previous {
                    self.state.address_match = AddressMatch::Matching;
                }
                continue;
            }

            self.next_pc(address)?;
            let insn = self.get_insn(self.state.pc)?;
            let pending = self.state.branch_map.count();
            let branch_limit = u8::from(insn.is_branch());

            if self.state.stop_at_last_branch && pending == 1 && insn.is_branch() {
                // Whether the branch retires is only known with the next packet
                self.state.stop_at_last_branch = false;
                return Ok(());
            }

            if self.state.pc != address {
                continue;
            }

            if self.get_insn(self.state.last_pc)?.is_uninferable_discon() {
                if pending > branch_limit {
                    return Err(Error::UnprocessedBranches {
                        count: pending,
                        insn,
                    });
                }
                return Ok(());
            }

            if pending == branch_limit {
                match target {
                    Target::Sync => return Ok(()),
                    Target::Packet { updiscon: false } => {
                        self.state.address_match = AddressMatch::AwaitingSecondHit(address);
                        return Ok(());
                    }
                    Target::Packet { updiscon: true } => (),
                }
            }
        }
    }

    /// Replay up to the second occurrence of a provisionally matched address
    pub(super) fn resolve_address_match(&mut self) -> Result<(), Error<B::Error>> {
        let AddressMatch::AwaitingSecondHit(previous) = self.state.address_match else {
            return Ok(());
        };
        self.state.address_match = AddressMatch::Matching;
        loop {
            self.next_pc(previous)?;
            if self.state.pc == previous {
                return Ok(());
            }
        }
    }
}
