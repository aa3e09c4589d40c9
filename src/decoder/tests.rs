// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0



use super::*;

use crate::binary;
use crate::config::Capabilities;
use crate::instruction::base::Set;
use crate::instruction::bits::Bits;
use crate::packet::{
    AddressInfo, Branch, InstructionTrace, QualStatus, Subformat, Support, Synchronization,
};

const NOP: Bits = Bits::Bit32(0x00000013);
const C_NOP: Bits = Bits::Bit16(0x0001);

replay_test!(
    straight_line,
    [(0x1000, NOP)],
    sync(Subformat::Trap, 0x1000) => [0x1000]
);

replay_test!(
    taken_branch,
    [
        (0x0ffc, NOP),
        // beq a0,a1,16
        (0x1000, Bits::Bit32(0x00b50863)),
        (0x1004, NOP),
        (0x1010, NOP),
    ],
    sync(Subformat::Start, 0x0ffc) => [0x0ffc]
    branches(1, 0b0, Some(0x1010 - 0x0ffc)) => [0x1000, 0x1010]
);

replay_test!(
    not_taken_branch,
    [
        (0x0ffc, NOP),
        // beq a0,a1,16
        (0x1000, Bits::Bit32(0x00b50863)),
        (0x1004, NOP),
        (0x1010, NOP),
    ],
    sync(Subformat::Start, 0x0ffc) => [0x0ffc]
    branches(1, 0b1, Some(0x1004 - 0x0ffc)) => [0x1000, 0x1004]
);

replay_test!(
    sync_at_branch,
    [
        // beq a0,a1,16
        (0x1000, Bits::Bit32(0x00b50863)),
        (0x1004, NOP),
        (0x1010, NOP),
    ],
    Synchronization {
        subformat: Subformat::Start,
        branch: false,
        address: 0x1000,
    } => [0x1000]
    address(0x1010 - 0x1000) => [0x1010]
);

replay_test!(
    call_return,
    [
        // jal ra,0x1000
        (0x2000, Bits::Bit32(0x000010ef)),
        (0x2004, NOP),
        (0x2008, NOP),
        (0x3000, NOP),
        // ret
        (0x3004, Bits::Bit32(0x00008067)),
    ],
    @caps { implicit_return: true }
    sync(Subformat::Start, 0x2000) => [0x2000]
    address(0x2008 - 0x2000) => [0x3000, 0x3004, 0x2004, 0x2008]
);

replay_test!(
    call_return_compressed,
    [
        // jal ra,0x1000
        (0x2000, Bits::Bit32(0x000010ef)),
        (0x2004, C_NOP),
        (0x2006, C_NOP),
        (0x3000, C_NOP),
        // c.jr ra
        (0x3002, Bits::Bit16(0x8082)),
    ],
    @caps { implicit_return: true, iaddress_lsb: 1 }
    sync(Subformat::Start, 0x2000 >> 1) => [0x2000]
    address((0x2006 - 0x2000) >> 1) => [0x3000, 0x3002, 0x2004, 0x2006]
);

replay_test!(
    explicit_return,
    [
        // jal ra,0x1000
        (0x2000, Bits::Bit32(0x000010ef)),
        (0x2004, NOP),
        (0x2008, NOP),
        (0x3000, NOP),
        // ret
        (0x3004, Bits::Bit32(0x00008067)),
    ],
    sync(Subformat::Start, 0x2000) => [0x2000]
    address(0x2004 - 0x2000) => [0x3000, 0x3004, 0x2004]
);

replay_test!(
    sequential_jump,
    [
        // lui t0,0x5
        (0x4000, Bits::Bit32(0x000052b7)),
        // jalr ra,16(t0)
        (0x4004, Bits::Bit32(0x010280e7)),
        (0x4008, NOP),
        (0x5010, NOP),
        (0x5014, NOP),
    ],
    sync(Subformat::Start, 0x4000) => [0x4000]
    address(0x5014 - 0x4000) => [0x4004, 0x5010, 0x5014]
);

replay_test!(
    full_address,
    [(0x1000, NOP), (0x1004, NOP), (0x1008, NOP)],
    @caps { full_address: true }
    sync(Subformat::Start, 0x1000) => [0x1000]
    address(0x1008) => [0x1004, 0x1008]
);

replay_test!(
    negative_delta,
    [
        (0x1000, NOP),
        (0x1004, NOP),
        // j -4
        (0x1008, Bits::Bit32(0xffdff06f)),
    ],
    sync(Subformat::Start, 0x1008) => [0x1008]
    address(-4) => [0x1004]
);

replay_test!(
    updiscon,
    [
        (0x1000, NOP),
        (0x1004, NOP),
        // jr a5
        (0x1008, Bits::Bit32(0x00078067)),
    ],
    sync(Subformat::Start, 0x1000) => [0x1000]
    AddressInfo { address: 4, updiscon: true } => [0x1004, 0x1008, 0x1004]
);

replay_test!(
    provisional_match,
    [
        (0x1000, NOP),
        (0x1004, NOP),
        // jr a5
        (0x1008, Bits::Bit32(0x00078067)),
    ],
    sync(Subformat::Start, 0x1000) => [0x1000]
    address(4) => [0x1004]
);

replay_test!(
    second_hit,
    [
        (0x1000, NOP),
        (0x1004, NOP),
        // j -4
        (0x1008, Bits::Bit32(0xffdff06f)),
    ],
    sync(Subformat::Start, 0x1000) => [0x1000]
    address(4) => [0x1004]
    address(0) => [0x1008, 0x1004, 0x1008, 0x1004]
);

replay_test!(
    resync,
    [(0x1000, NOP), (0x1004, NOP), (0x1008, NOP), (0x2000, NOP)],
    sync(Subformat::Start, 0x1000) => [0x1000]
    sync(Subformat::Start, 0x1008) => [0x1004, 0x1008]
    sync(Subformat::Trap, 0x2000) => [0x2000]
);

replay_test!(
    extension,
    [
        (0x1000, NOP),
        (0x1004, NOP),
        // j -4
        (0x1008, Bits::Bit32(0xffdff06f)),
    ],
    sync(Subformat::Start, 0x1000) => [0x1000]
    address(4) => [0x1004]
    InstructionTrace::Extension => [0x1008, 0x1004, 0x1008, 0x1004]
);

replay_test!(
    uninferable_jump_to_branch,
    [
        (0x1000, NOP),
        // jr a5
        (0x1004, Bits::Bit32(0x00078067)),
        // beq a0,a1,16
        (0x2000, Bits::Bit32(0x00b50863)),
        (0x2004, NOP),
        (0x2010, NOP),
    ],
    sync(Subformat::Start, 0x1000) => [0x1000]
    branches(1, 0b1, Some(0x1000)) => [0x1004, 0x2000]
    address(4) => [0x2004]
);

/// The branch at an uninferable jump's target is resolved by a later packet
#[test]
fn branch_pending_after_uninferable_jump() {
    let mut decoder = builder()
        .with_binary(
            binary::from_sorted_map([
                (0x1000, NOP),
                // jr a5
                (0x1004, Bits::Bit32(0x00078067)),
                // beq a0,a1,16
                (0x2000, Bits::Bit32(0x00b50863)),
            ])
            .expect("Unsorted binary"),
        )
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&branches(1, 0b1, Some(0x1000)).into())
        .expect("Could not process packet");
    assert_eq!(decoder.state().pc, 0x2000);
    assert_eq!(decoder.state().branch_map.count(), 1);
    assert_eq!(decoder.state().address_match, AddressMatch::Matching);
}

/// A full branch map's address field is not a reported address
#[test]
fn full_branch_map_keeps_address() {
    let mut decoder = builder()
        .with_binary(
            binary::from_sorted_map([
                (0x1000, NOP),
                // beq a0,a1,-4
                (0x1004, Bits::Bit32(0xfeb50ee3)),
            ])
            .expect("Unsorted binary"),
        )
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&branches(0, 0, Some(0x100)).into())
        .expect("Could not process packet");
    assert_eq!(decoder.state().address, 0x1000);
    assert_eq!(decoder.state().pc, 0x1004);
    assert_eq!(decoder.state().branch_map.count(), 1);
    assert_eq!(decoder.state().instruction_count, 62);
}

/// A copy loop reported via a full branch map
#[test]
fn full_branch_map() {
    let code = copy_code();
    let mut decoder = builder()
        .with_binary(binary::from_sorted_map(code).expect("Unsorted binary"))
        .with_sink(Vec::<Retirement>::new())
        .build();

    decoder
        .process_te_inst(&sync(Subformat::Start, 0x80000010).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&branches(0, 1 << 30, None).into())
        .expect("Could not process packet");
    let retired: Vec<u64> = decoder.sink().iter().map(|r| r.pc).collect();
    let expected: Vec<u64> = core::iter::once(0x80000010)
        .chain(
            core::iter::repeat([0x80000014, 0x80000016, 0x80000018, 0x8000001a, 0x8000001c])
                .take(31)
                .flatten(),
        )
        .collect();
    assert_eq!(retired, expected);
    assert_eq!(decoder.state().branch_map.count(), 1);
    assert!(!decoder.state().stop_at_last_branch);

    decoder.sink_mut().clear();
    decoder
        .process_te_inst(&address(0x20 - 0x10).into())
        .expect("Could not process packet");
    assert_eq!(
        decoder.sink().iter().map(|r| r.pc).collect::<Vec<_>>(),
        [0x80000020]
    );
    assert!(decoder.state().branch_map.is_empty());

    let stats = decoder.statistics();
    assert!(stats.hits + stats.same > stats.gets / 2);
}

#[test]
fn first_retirement() {
    let mut decoder = builder()
        .with_binary(binary::from_sorted_map([(0x1000, NOP)]).expect("Unsorted binary"))
        .with_sink(Vec::<Retirement>::new())
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Trap, 0x1000).into())
        .expect("Could not process packet");

    let retired = decoder.sink();
    assert_eq!(retired.len(), 1);
    assert_eq!(retired[0].last_pc, NO_ADDRESS);
    assert_eq!(retired[0].pc, 0x1000);
    assert_eq!(retired[0].insn.bits, NOP);

    let state = decoder.state();
    assert_eq!(state.pc, 0x1000);
    assert_eq!(state.last_pc, 0x1000);
    assert_eq!(state.instruction_count, 1);
    assert!(!state.start_of_trace);
}

#[test]
fn return_stack() {
    let code = [
        // jal ra,0x1000
        (0x2000, Bits::Bit32(0x000010ef)),
        (0x2004, NOP),
        (0x3000, NOP),
    ];
    let caps = Capabilities {
        implicit_return: true,
        ..Default::default()
    };
    let mut decoder = builder()
        .with_capabilities(&caps)
        .with_binary(binary::from_sorted_map(code).expect("Unsorted binary"))
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x2000).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&address(0x1000).into())
        .expect("Could not process packet");
    assert_eq!(decoder.state().pc, 0x3000);
    assert_eq!(decoder.state().return_stack.peek(), Some(0x2004));

    // Synchronization invalidates all return addresses
    decoder
        .process_te_inst(&sync(Subformat::Trap, 0x2004).into())
        .expect("Could not process packet");
    assert!(decoder.state().return_stack.is_empty());
}

#[test]
fn ended_ntr() {
    let code = [
        (0x1000, NOP),
        (0x1004, NOP),
        // j -4
        (0x1008, Bits::Bit32(0xffdff06f)),
    ];
    let mut decoder = builder()
        .with_binary(binary::from_sorted_map(code).expect("Unsorted binary"))
        .with_sink(Vec::<Retirement>::new())
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&address(4).into())
        .expect("Could not process packet");
    assert_eq!(
        decoder.state().address_match,
        AddressMatch::AwaitingSecondHit(0x1004)
    );

    decoder.sink_mut().clear();
    decoder
        .process_support(&support(QualStatus::EndedNtr))
        .expect("Could not process support");
    assert_eq!(
        decoder.sink().iter().map(|r| r.pc).collect::<Vec<_>>(),
        [0x1008, 0x1004]
    );
    assert_eq!(decoder.state().address_match, AddressMatch::Matching);
    assert!(decoder.state().start_of_trace);

    assert_eq!(
        decoder.process_te_inst(&address(4).into()),
        Err(Error::StartOfTrace)
    );
}

#[test]
fn ended_rep() {
    let code = [
        (0x1000, NOP),
        (0x1004, NOP),
        // j -4
        (0x1008, Bits::Bit32(0xffdff06f)),
    ];
    let mut decoder = builder()
        .with_binary(binary::from_sorted_map(code).expect("Unsorted binary"))
        .with_sink(Vec::<Retirement>::new())
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&address(4).into())
        .expect("Could not process packet");

    decoder.sink_mut().clear();
    decoder
        .process_support(&support(QualStatus::EndedRep))
        .expect("Could not process support");
    assert!(decoder.sink().is_empty());
    assert!(decoder.state().start_of_trace);

    // A new trace starts without following the old path
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    assert_eq!(
        decoder.sink().iter().map(|r| r.pc).collect::<Vec<_>>(),
        [0x1000]
    );
    assert_eq!(decoder.state().address_match, AddressMatch::Matching);
}

#[test]
fn support_without_effect() {
    let mut decoder = builder()
        .with_binary(binary::from_sorted_map([(0x1000, NOP)]).expect("Unsorted binary"))
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");

    for status in [QualStatus::NoChange, QualStatus::TraceLost] {
        decoder
            .process_support(&support(status))
            .expect("Could not process support");
        assert!(!decoder.state().start_of_trace);
    }
    decoder
        .process_support(&Support {
            support_type: 1,
            qual_status: QualStatus::EndedRep,
        })
        .expect("Could not process support");
    assert!(!decoder.state().start_of_trace);
}

#[test]
fn reset() {
    let mut decoder = builder()
        .with_binary(binary::from_sorted_map([(0x1000, NOP)]).expect("Unsorted binary"))
        .build();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    assert_ne!(decoder.statistics().gets, 0);

    decoder.reset();
    let state = decoder.state();
    assert!(state.start_of_trace);
    assert_eq!(state.pc, NO_ADDRESS);
    assert_eq!(state.last_pc, NO_ADDRESS);
    assert_eq!(state.instruction_count, 0);
    assert_eq!(*decoder.statistics(), cache::Statistics::default());
    assert_eq!(
        decoder.process_te_inst(&address(0).into()),
        Err(Error::StartOfTrace)
    );
}

#[test]
fn sink_fn() {
    let mut transitions = Vec::new();
    let mut decoder = builder()
        .with_binary(
            binary::from_sorted_map([(0x1000, NOP), (0x1004, NOP)]).expect("Unsorted binary"),
        )
        .with_sink(from_fn(|last, pc, _| transitions.push((last, pc))))
        .build_with_cache::<4>();
    decoder
        .process_te_inst(&sync(Subformat::Start, 0x1000).into())
        .expect("Could not process packet");
    decoder
        .process_te_inst(&address(4).into())
        .expect("Could not process packet");
    drop(decoder);
    assert_eq!(transitions, [(NO_ADDRESS, 0x1000), (0x1000, 0x1004)]);
}

mod caching {
    use super::*;

    use crate::decoder::cache::{Cache, Statistics};
    use crate::instruction::decode::{Decode, Disassembler};

    #[test]
    fn transparency() {
        let mut binary = binary::from_sorted_map([(0x1000, Bits::Bit32(0x00b50863)), (0x1004, NOP)])
            .expect("Unsorted binary");
        let expected = Disassembler.decode(Set::Rv32I, 0x1000, Bits::Bit32(0x00b50863));

        let mut cache = Cache::<8>::default();
        let mut resolve = |address| {
            cache
                .resolve(address, &mut binary, &Disassembler, Set::Rv32I)
                .expect("Could not resolve")
        };
        // miss, same, miss, hit
        assert_eq!(resolve(0x1000), expected);
        assert_eq!(resolve(0x1000), expected);
        assert_eq!(resolve(0x1004).pc, 0x1004);
        assert_eq!(resolve(0x1000), expected);

        let stats = cache.statistics();
        assert_eq!(stats.gets, 4);
        assert_eq!(stats.same, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn collision() {
        let mut binary =
            binary::from_sorted_map([(0x1000, NOP), (0x1004, C_NOP)]).expect("Unsorted binary");
        let mut cache = Cache::<4>::default();
        for address in [0x1000, 0x1004, 0x1000, 0x1004] {
            let insn = cache
                .resolve(address, &mut binary, &Disassembler, Set::Rv32I)
                .expect("Could not resolve");
            assert_eq!(insn.pc, address);
        }
        assert_eq!(cache.statistics().hits, 0);
        assert_eq!(cache.statistics().same, 0);
    }

    #[test]
    fn invalidate() {
        let mut binary = binary::from_sorted_map([(0x1000, NOP)]).expect("Unsorted binary");
        let mut cache = Cache::<4>::default();
        cache
            .resolve(0x1000, &mut binary, &Disassembler, Set::Rv32I)
            .expect("Could not resolve");
        cache.invalidate();
        cache
            .resolve(0x1000, &mut binary, &Disassembler, Set::Rv32I)
            .expect("Could not resolve");
        assert_eq!(cache.statistics().gets, 2);
        assert_eq!(cache.statistics().hits + cache.statistics().same, 0);
    }

    proptest::proptest! {
        #[test]
        fn transparency_random(indices in proptest::collection::vec(0u64..16, 1..64)) {
            let code: Vec<_> = (0..16u64)
                .map(|i| (0x1000 + 2 * i, if i % 3 == 0 { Bits::Bit16(0x8082) } else { C_NOP }))
                .collect();
            let mut binary = binary::from_sorted_map(code.as_slice()).expect("Unsorted binary");
            let mut cache = Cache::<4>::default();
            for index in &indices {
                let (address, bits) = code[*index as usize];
                let insn = cache
                    .resolve(address, &mut binary, &Disassembler, Set::Rv32I)
                    .expect("Could not resolve");
                proptest::prop_assert_eq!(insn, Disassembler.decode(Set::Rv32I, address, bits));
            }
            let stats = cache.statistics();
            proptest::prop_assert_eq!(stats.gets, indices.len() as u64);
            proptest::prop_assert!(stats.hits + stats.same < stats.gets);
        }
    }

    #[test]
    fn statistics_display() {
        let stats = Statistics {
            gets: 4,
            hits: 1,
            same: 2,
        };
        assert_eq!(
            stats.to_string(),
            "decoded-cache: same =       2 (50.00%), hits =        1 (25.00%), total =        4, combined hit-rate = 75.00%"
        );
        assert!(
            Statistics::default()
                .to_string()
                .ends_with("combined hit-rate = 0.00%")
        );
    }
}

fn sync(subformat: Subformat, address: u64) -> Synchronization {
    Synchronization {
        subformat,
        branch: true,
        address,
    }
}

fn address(address: i64) -> AddressInfo {
    AddressInfo {
        address,
        updiscon: false,
    }
}

fn branches(branches: u8, branch_map: u32, address: Option<i64>) -> Branch {
    Branch {
        branches,
        branch_map,
        address: address.map(self::address),
    }
}

fn support(qual_status: QualStatus) -> Support {
    Support {
        support_type: 0,
        qual_status,
    }
}

fn copy_code() -> [(u64, Bits); 9] {
    [
        (0x80000010, NOP),
        // _copy_code
        (0x80000014, C_NOP),
        (0x80000016, C_NOP),
        (0x80000018, C_NOP),
        (0x8000001a, C_NOP),
        // bltu a1,a2,-8
        (0x8000001c, Bits::Bit32(0xfec5ece3)),
        // fence.i
        (0x80000020, Bits::Bit32(0x0000100f)),
        // c.jr ra
        (0x80000024, Bits::Bit16(0x8082)),
        // _die: c.j 0
        (0x80000026, Bits::Bit16(0xa001)),
    ]
}
