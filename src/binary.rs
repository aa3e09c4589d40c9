// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Binaries containing encoded instructions
//!
//! Replaying a trace requires knowledge about the program being traced. This
//! module defines the [`Binary`] trait used by the
//! [`Decoder`][crate::decoder::Decoder] for retrieving the raw [`Bits`] of
//! instructions as well as a number of types implementing the trait. These
//! include:
//!
//! * some [basic] [`Binary`]s such as adapters that may be created through
//!   free fns such as [`from_fn`] and [`from_segment`],
//! * modifiers such as [`Offset`] that are usually created through provided fns
//!   of the [`Binary`] trait,
//! * a [`Binary`] impl for pairs, consulting the second [`Binary`] if the first
//!   one does not cover an address, and
//! * feature-dependent [`Binary`]s, e.g. for using ELF files as [`Binary`]s.
//!
//! [`Binary`]s may be mutated when fetching instruction [`Bits`], e.g. for
//! caching purposes, and are thus intended for use by a single
//! [`Decoder`][crate::decoder::Decoder].
//!
//! # Example
//!
//! The following constructs a [`Binary`] from a firmware image and a bootrom.
//!
//! ```
//! use riscv_te_replay::binary::{self, Binary};
//! use riscv_te_replay::instruction::bits::Bits;
//!
//! let bootrom = b"\x97\x02\x00\x00\x93\x85\x02\x02\x73\x25\x40\xf1\x83\xb2\x82\x01\x67\x80\x02\x00";
//! let firmware = b"\x97\x02\x00\x00\x93\x82\x02\x00\x73\xa0\x52\x30\x73\x00\x50\x10\x6f\xf0\xdf\xff";
//! let mut binary = (
//!     binary::from_segment(bootrom).with_offset(0x1000),
//!     binary::from_segment(firmware).with_offset(0x80000000),
//! );
//! assert_eq!(binary.get_bits(0x1010), Ok(Bits::Bit32(0x00028067)));
//! assert_eq!(binary.get_bits(0x80000010), Ok(Bits::Bit32(0xffdff06f)));
//! assert!(binary.get_bits(0x2000).is_err());
//! ```

pub mod basic;
#[cfg(feature = "elf")]
pub mod elf;
pub mod error;


pub use basic::{Empty, from_fn, from_map, from_segment, from_sorted_map};

use crate::instruction::bits::Bits;

use error::{MaybeMiss, Miss};

/// A binary of some sort that contains encoded instructions
///
/// See the [module level][self] documentation for more details.
pub trait Binary {
    /// Error type returned by [`get_bits`][Self::get_bits]
    type Error;

    /// Retrieve the [`Bits`] of the instruction at the given address
    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error>;

    /// "Move" this binary by the given offset
    ///
    /// See [`Offset`] for more details.
    fn with_offset(self, offset: u64) -> Offset<Self>
    where
        Self: Sized,
        Self::Error: Miss,
    {
        Offset {
            inner: self,
            offset,
        }
    }
}

impl<B: Binary + ?Sized> Binary for &mut B {
    type Error = B::Error;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        B::get_bits(self, address)
    }
}

/// [`Binary`] implementation for a tuple of two binaries
///
/// This impl allows combining [`Binary`]s as long as they agree on their error
/// type. If the first [`Binary`] returns a "miss", the second one is consulted.
impl<A, B, E> Binary for (A, B)
where
    A: Binary<Error = E>,
    B: Binary<Error = E>,
    E: MaybeMiss,
{
    type Error = E;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        let res = self.0.get_bits(address);
        if res.is_miss() {
            self.1.get_bits(address)
        } else {
            res
        }
    }
}

impl<B> Binary for Option<B>
where
    B: Binary,
    B::Error: Miss,
{
    type Error = B::Error;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        self.as_mut()
            .map(|b| b.get_bits(address))
            .unwrap_or_else(|| Miss::miss(address))
    }
}

/// [`Binary`] moved by a fixed offset
///
/// Accesses will be mapped by subtracting the fixed offset from the address.
/// Accesses to addresses lower than the offset will result in a [miss][Miss].
#[derive(Copy, Clone, Debug)]
pub struct Offset<B> {
    inner: B,
    offset: u64,
}

impl<B> Offset<B> {
    /// Retrieve the offset
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<B> Binary for Offset<B>
where
    B: Binary,
    B::Error: Miss,
{
    type Error = B::Error;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        address
            .checked_sub(self.offset)
            .ok_or_else(|| B::Error::miss(address))
            .and_then(|a| self.inner.get_bits(a))
    }
}
