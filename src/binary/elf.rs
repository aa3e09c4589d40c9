// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! ELF related utilities

use core::borrow::Borrow;

use elf::ElfBytes;
use elf::endian::EndianParse;

use crate::instruction::{base, bits::Bits};

use super::{Binary, error};

/// Static ELF [`Binary`]
///
/// This [`Binary`] retrieves instruction [`Bits`] from executable `LOAD`
/// segments found in [`ElfBytes`] based on virtual address mapping. Neither
/// decompression nor dynamic linking are supported.
#[derive(Copy, Clone)]
pub struct Elf<'d, E, P>
where
    E: Borrow<ElfBytes<'d, P>>,
    P: EndianParse,
{
    elf: E,
    last_segment: (u64, &'d [u8]),
    isa: base::Set,
    phantom: core::marker::PhantomData<P>,
}

impl<'d, E, P> Elf<'d, E, P>
where
    E: Borrow<ElfBytes<'d, P>>,
    P: EndianParse,
{
    /// Create a new ELF [`Binary`]
    pub fn new(elf: E) -> Result<Self, Error> {
        use elf::abi;

        let hdr = &elf.borrow().ehdr;
        if hdr.e_machine != abi::EM_RISCV {
            return Err(Error::UnsupportedArchitecture);
        }
        if !hdr.endianness.is_little() {
            return Err(Error::UnsupportedEndianess);
        }
        let isa = match hdr.class {
            elf::file::Class::ELF32 => base::Set::Rv32I,
            elf::file::Class::ELF64 => base::Set::Rv64I,
        };

        Ok(Self {
            elf,
            last_segment: (u64::MAX, &[]),
            isa,
            phantom: Default::default(),
        })
    }

    /// Retrieve the [`base::Set`] implied by the ELF's class
    ///
    /// The value is intended for configuring the
    /// [`Decoder`][crate::decoder::Decoder] via
    /// [`Builder::with_isa`][crate::decoder::Builder::with_isa].
    pub fn base_set(&self) -> base::Set {
        self.isa
    }
}

impl<'d, E, P> Binary for Elf<'d, E, P>
where
    E: Borrow<ElfBytes<'d, P>>,
    P: EndianParse,
{
    type Error = Error;

    fn get_bits(&mut self, address: u64) -> Result<Bits, Self::Error> {
        // Iterator over all relevant segments' offset and data
        let segments = self
            .elf
            .borrow()
            .segments()
            .into_iter()
            .flat_map(|s| s.iter())
            .filter(|s| s.p_type == elf::abi::PT_LOAD && s.p_flags & elf::abi::PF_X != 0)
            .map(|s| {
                self.elf
                    .borrow()
                    .segment_data(&s)
                    .map(|d| (s.p_vaddr, d))
                    .map_err(Error::CouldNotRetrieveData)
            });

        // Start with the segment used last, as that's most likely the one
        let (insn_data, segment) = core::iter::once(Ok(self.last_segment))
            .chain(segments)
            .map(|s| {
                let (base, data) = s?;
                let Some(offset) = address.checked_sub(base) else {
                    return Ok(None);
                };
                let offset = offset.try_into().map_err(Error::ExceededHostUSize)?;
                let res = data
                    .split_at_checked(offset)
                    .filter(|(_, insn_data)| !insn_data.is_empty())
                    .map(|(_, insn_data)| (insn_data, (base, data)));
                Ok(res)
            })
            .find_map(Result::transpose)
            .ok_or(Error::NoSegmentFound)??;

        self.last_segment = segment;
        Bits::extract(insn_data)
            .map(|(b, _)| b)
            .ok_or(Error::InvalidInstruction)
    }
}

/// ELF specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No segment was found containing the address
    #[error("Could not find segment for address")]
    NoSegmentFound,
    /// The data for a segment could not be retrieved
    #[error("Could not retrieve data for segment")]
    CouldNotRetrieveData(#[source] elf::parse::ParseError),
    /// Could not use an address or offset because it is too big for the host
    #[error("An offset exceeds what can be represented with host native addresses")]
    ExceededHostUSize(#[source] core::num::TryFromIntError),
    /// No complete instruction could be extracted from the data
    #[error("No valid instruction at address")]
    InvalidInstruction,
    /// The ELF file is not a RISC-V ELF file
    #[error("The target architecture is not supported")]
    UnsupportedArchitecture,
    /// The ELF file is not little endian
    #[error("The target is not little endian")]
    UnsupportedEndianess,
}

impl error::Miss for Error {
    fn miss(_: u64) -> Self {
        Self::NoSegmentFound
    }
}

impl error::MaybeMiss for Error {
    fn is_miss(&self) -> bool {
        matches!(self, Self::NoSegmentFound)
    }
}
