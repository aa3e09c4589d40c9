// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Basic [`Binary`]s and adapters

use crate::instruction::bits::Bits;

use super::Binary;
use super::error;

/// [`Binary`] adapter for an [`FnMut`]
///
/// This forwards calls to [`Binary::get_bits`] to the wrapped [`FnMut`].
#[derive(Copy, Clone, Default, Debug)]
pub struct Func<F: FnMut(u64) -> Result<Bits, E>, E> {
    func: F,
    phantom: core::marker::PhantomData<E>,
}

impl<F: FnMut(u64) -> Result<Bits, E>, E> Binary for Func<F, E> {
    type Error = E;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        (self.func)(address)
    }
}

/// Create a [`Func`] [`Binary`] from an [`FnMut`]
pub fn from_fn<F: FnMut(u64) -> Result<Bits, E>, E>(func: F) -> Func<F, E> {
    Func {
        func,
        phantom: Default::default(),
    }
}

/// [`Binary`] consisting of a single segment of encoded instructions
///
/// This [`Binary`] serves a single little endian buffer as a code segment
/// starting from address `0`. Use [`Binary::with_offset`] for placing it at
/// its actual location.
///
/// # Example
///
/// ```
/// use riscv_te_replay::binary::{self, Binary};
/// use riscv_te_replay::instruction::bits::Bits;
///
/// let bootrom = b"\x97\x02\x00\x00\x93\x85\x02\x02\x73\x25\x40\xf1\x83\xb2\x82\x01\x67\x80\x02\x00";
/// let mut bootrom = binary::from_segment(bootrom).with_offset(0x1000);
/// assert_eq!(bootrom.get_bits(0x1010), Ok(Bits::Bit32(0x00028067)));
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Segment<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> Segment<T> {
    /// Create a new [`Binary`] from the given data
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Retrieve the number of bytes covered
    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    /// Check whether this segment covers no address at all
    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }
}

impl<T: AsRef<[u8]>> Binary for Segment<T> {
    type Error = error::SegmentError;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        let offset = address.try_into().map_err(Self::Error::ExceededHostUSize)?;
        let insn_data = self
            .data
            .as_ref()
            .split_at_checked(offset)
            .map(|(_, d)| d)
            .filter(|d| !d.is_empty())
            .ok_or(Self::Error::AddressNotCovered)?;
        Bits::extract(insn_data)
            .map(|(b, _)| b)
            .ok_or(Self::Error::InvalidInstruction)
    }
}

/// Create a [`Segment`] [`Binary`] from some data
pub fn from_segment<T: AsRef<[u8]>>(data: T) -> Segment<T> {
    Segment::new(data)
}

/// [`Binary`] defined by a set of addresses-[`Bits`] pairs
///
/// This [`Binary`] is backed by a slice of addresses-[`Bits`] pairs specifying
/// the presence of an instruction at the specified address. The [`Binary`] is
/// meant for small, fixed code sequences such as bootroms or hand-assembled
/// test programs.
#[derive(Copy, Clone, Default, Debug)]
pub struct SimpleMap<T: AsRef<[(u64, Bits)]>> {
    inner: T,
}

impl<T: AsRef<[(u64, Bits)]>> SimpleMap<T> {
    /// Create a new [`Binary`], potentially from a different type of container
    ///
    /// Sorts the slice held by the given container, then converts this to the
    /// target type and returns the [`Binary`] contructed from that.
    pub fn new<I>(mut inner: I) -> Self
    where
        T: From<I>,
        I: AsMut<[(u64, Bits)]>,
    {
        inner.as_mut().sort_unstable_by_key(|(a, _)| *a);
        Self {
            inner: inner.into(),
        }
    }

    /// Create a [`Binary`] from a container holding a sorted slice
    ///
    /// Returns [`None`] if the slice is not sorted by address.
    pub fn from_sorted(inner: T) -> Option<Self> {
        inner
            .as_ref()
            .is_sorted_by_key(|(a, _)| *a)
            .then_some(Self { inner })
    }
}

impl<T: AsRef<[(u64, Bits)]>> Binary for SimpleMap<T> {
    type Error = error::NoInstruction;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        let map = self.inner.as_ref();
        map.binary_search_by_key(&address, |(a, _)| *a)
            .map(|i| map[i].1)
            .map_err(|_| error::NoInstruction)
    }
}

/// Create a [`SimpleMap`] [`Binary`] from some `AsRef<[(u64, Bits)]>`
///
/// Returns `None` if the address-[`Bits`] pairs are not sorted by address.
pub fn from_sorted_map<T: AsRef<[(u64, Bits)]>>(inner: T) -> Option<SimpleMap<T>> {
    SimpleMap::from_sorted(inner)
}

/// Create a [`SimpleMap`] [`Binary`] from some `AsMut<[(u64, Bits)]>`
pub fn from_map<T>(inner: T) -> SimpleMap<T>
where
    T: AsRef<[(u64, Bits)]> + AsMut<[(u64, Bits)]>,
{
    SimpleMap::new(inner)
}

/// A [`Binary`] that does not contain any instructions
#[derive(Copy, Clone, Default, Debug)]
pub struct Empty;

impl Binary for Empty {
    type Error = error::NoInstruction;

    fn get_bits(&mut self, _: u64) -> Result<Bits, Self::Error> {
        Err(error::NoInstruction)
    }
}
