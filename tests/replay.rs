// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Replay of randomly generated executions
//!
//! Programs consist of plain instructions, conditional branches and forward
//! jumps. Executions are simulated with arbitrary branch outcomes, and packets
//! are produced the way an encoder would: a synchronization at the start, full
//! branch maps whenever 31 branches accumulated and a final packet reporting
//! the address of the last retired instruction.

use proptest::prelude::*;

use riscv_te_replay::instruction::bits::Bits;
use riscv_te_replay::packet::{
    AddressInfo, Branch, InstructionTrace, Subformat, Synchronization,
};
use riscv_te_replay::types::branch::Map;
use riscv_te_replay::{binary, config, decoder};

const BASE: u64 = 0x8000_0000;

#[derive(Copy, Clone, Debug)]
enum Slot {
    Nop,
    Branch(usize),
    Jump(usize),
}

impl Slot {
    fn bits(self, index: usize) -> Bits {
        let offset = |target: usize| (target as i64 - index as i64) * 4;
        match self {
            Self::Nop => Bits::Bit32(0x00000013),
            Self::Branch(target) => Bits::Bit32(beq(offset(target))),
            Self::Jump(target) => Bits::Bit32(jal_zero(offset(target))),
        }
    }
}

/// Encode `beq a0,a1,offset`
fn beq(offset: i64) -> u32 {
    let imm = (offset as u32) & 0x1fff;
    let bit = |n: u32| (imm >> n) & 1;
    (bit(12) << 31)
        | (((imm >> 5) & 0x3f) << 25)
        | (11 << 20)
        | (10 << 15)
        | (((imm >> 1) & 0xf) << 8)
        | (bit(11) << 7)
        | 0x63
}

/// Encode `jal zero,offset`
fn jal_zero(offset: i64) -> u32 {
    let imm = (offset as u32) & 0x1fffff;
    let bit = |n: u32| (imm >> n) & 1;
    (bit(20) << 31) | (((imm >> 1) & 0x3ff) << 21) | (bit(11) << 20) | (imm & 0xff000) | 0x6f
}

fn address(index: usize) -> u64 {
    BASE + 4 * index as u64
}

/// Programs start with a plain instruction and end in a backward branch
fn program() -> impl Strategy<Value = Vec<Slot>> {
    (3usize..32).prop_flat_map(|len| {
        (
            prop::collection::vec((0u8..3, any::<usize>()), len - 2),
            0..len - 1,
        )
            .prop_map(move |(body, back)| {
                let body = body.into_iter().enumerate().map(|(i, (kind, target))| {
                    let index = i + 1;
                    match kind {
                        0 => Slot::Nop,
                        1 => Slot::Branch(target % len),
                        _ => Slot::Jump(index + 1 + target % (len - 1 - index)),
                    }
                });
                core::iter::once(Slot::Nop)
                    .chain(body)
                    .chain(core::iter::once(Slot::Branch(back)))
                    .collect()
            })
    })
}

/// Simulate an execution, returning retired addresses and packets
fn execute(program: &[Slot], outcomes: &[bool], steps: usize) -> (Vec<u64>, Vec<InstructionTrace>) {
    let mut outcomes = outcomes.iter().copied().cycle();
    let mut retired = vec![address(0)];
    let mut packets = vec![InstructionTrace::from(Synchronization {
        subformat: Subformat::Start,
        branch: true,
        address: address(0) >> 1,
    })];
    let mut map = Map::default();

    let mut index = 0;
    loop {
        let last = retired.len() >= steps;
        index = match program[index] {
            Slot::Branch(target) => {
                let taken = index == program.len() - 1 || outcomes.next().unwrap_or(true);
                map.push_branch_taken(taken).expect("Branch map overflow");
                if last {
                    break;
                }
                if map.count() == Map::FULL_PACKET_BRANCHES {
                    packets.push(
                        Branch {
                            branches: 0,
                            branch_map: map.raw_map() as u32,
                            address: None,
                        }
                        .into(),
                    );
                    map.clear();
                }
                if taken { target } else { index + 1 }
            }
            _ if last => break,
            Slot::Jump(target) => target,
            Slot::Nop => index + 1,
        };
        retired.push(address(index));
    }

    let info = AddressInfo {
        address: ((address(index) - address(0)) >> 1) as i64,
        updiscon: false,
    };
    if map.is_empty() {
        packets.push(info.into());
    } else {
        packets.push(
            Branch {
                branches: map.count(),
                branch_map: map.raw_map() as u32,
                address: Some(info),
            }
            .into(),
        );
    }

    (retired, packets)
}

proptest! {
    #[test]
    fn replay_fidelity(
        program in program(),
        outcomes in prop::collection::vec(any::<bool>(), 1..64),
        steps in 2usize..400,
    ) {
        let code: Vec<_> = program
            .iter()
            .enumerate()
            .map(|(i, s)| (address(i), s.bits(i)))
            .collect();
        let (expected, packets) = execute(&program, &outcomes, steps);

        let caps = config::Capabilities {
            iaddress_lsb: 1,
            ..Default::default()
        };
        let mut retired = Vec::new();
        let mut branches = 0usize;
        let mut decoder = decoder::builder()
            .with_capabilities(&caps)
            .with_binary(binary::from_sorted_map(code).expect("Unsorted binary"))
            .with_sink(decoder::from_fn(|_, pc, insn| {
                retired.push(pc);
                branches += usize::from(insn.is_branch());
            }))
            .build();
        for packet in &packets {
            decoder.process_te_inst(packet).expect("Could not process packet");
        }

        // Only the branch at the reported address may remain unresolved
        let last = expected.last().copied().unwrap_or(BASE);
        let last_is_branch = program_branches(&program, &[last]) == 1;
        prop_assert_eq!(decoder.state().branch_map.count(), u8::from(last_is_branch));
        drop(decoder);

        prop_assert_eq!(&retired, &expected);
        prop_assert_eq!(branches, program_branches(&program, &expected));
    }
}

/// Number of branches among the retired instructions
fn program_branches(program: &[Slot], retired: &[u64]) -> usize {
    retired
        .iter()
        .filter(|a| matches!(program[((**a - BASE) / 4) as usize], Slot::Branch(_)))
        .count()
}
