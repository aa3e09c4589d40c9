// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

//! # Execution path replay for Efficient Trace for RISC-V
//!
//! This crate reconstructs the sequence of retired instruction addresses of a
//! single RISC-V hart from [Efficient Trace for RISC-V][etrace] instruction
//! packets. The encoder only reports what the decoder can not infer from the
//! program itself: synchronization addresses, maps of conditional branch
//! outcomes and the targets of uninferable jumps. The [`Decoder`] replays the
//! control flow over a copy of the traced [`Binary`][binary::Binary] and
//! reports every retired instruction to a [`Retire`][decoder::Retire] sink.
//!
//! This crate is not concerned with how packets are transported or how they
//! are extracted from the raw bitstream. It consumes [packets][packet] as
//! already parsed records.
//!
//! # Features
//! - delta and full address mode
//! - implicit return inference via a shadow call stack
//! - sequentially inferable jumps (`lui`/`auipc` followed by `jalr`)
//! - built-in decoding of all control flow relevant RV32/RV64 instructions,
//!   including the `C` extension
//! - a small direct-mapped cache for decoded instructions
//!
//! # no_std
//! This crate only depends on the Core Library. The `alloc` feature adds
//! [`Retire`][decoder::Retire] impls for growable containers. The `elf` and
//! `riscv-isa` features enable [`Binary`][binary::Binary] and
//! [`Decode`][instruction::decode::Decode] impls based on the respective
//! crates, `serde` enables (de)serialization of [`config`] and [`packet`]
//! types.
//!
//! # Example
//!
//! The following example replays a short trace over a piece of code given as
//! raw bytes, located at `0x80000028`.
//!
//! ```
//! use riscv_te_replay::{binary, config, decoder, packet};
//! use riscv_te_replay::binary::Binary;
//!
//! // c.lw a3,0(a0); c.addi a0,4; c.sw a3,0(a1); c.addi a1,4; bltu a1,a2,-8; ret
//! let code = b"\x94\x41\x11\x05\x94\xc1\x91\x05\xe3\xec\xc5\xfe\x82\x80";
//! let capabilities = config::Capabilities {
//!     iaddress_lsb: 1,
//!     ..Default::default()
//! };
//!
//! let mut pcs = Vec::new();
//! let mut decoder = decoder::builder()
//!     .with_capabilities(&capabilities)
//!     .with_binary(binary::from_segment(code).with_offset(0x80000028))
//!     .with_sink(decoder::from_fn(|_, pc, _| pcs.push(pc)))
//!     .build();
//!
//! let sync = packet::Synchronization {
//!     subformat: packet::Subformat::Start,
//!     branch: true,
//!     address: 0x80000028 >> 1,
//! };
//! decoder.process_te_inst(&sync.into()).unwrap();
//! let branches = packet::Branch {
//!     branches: 2,
//!     branch_map: 0b10,
//!     address: Some(packet::AddressInfo {
//!         address: (0x80000034 - 0x80000028) >> 1,
//!         updiscon: false,
//!     }),
//! };
//! decoder.process_te_inst(&branches.into()).unwrap();
//! drop(decoder);
//!
//! assert_eq!(pcs.first(), Some(&0x80000028));
//! assert_eq!(pcs.last(), Some(&0x80000034));
//! ```
//!
//! [etrace]: https://github.com/riscv-non-isa/riscv-trace-spec/
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod binary;
pub mod config;
pub mod decoder;
pub mod instruction;
pub mod packet;
pub mod types;

pub use decoder::Decoder;
pub use instruction::Instruction;
