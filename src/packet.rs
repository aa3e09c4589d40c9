// Copyright (C) 2024, 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Instruction trace packets
//!
//! This module provides definitions for the `te_inst` packets and the support
//! messages consumed by the [`Decoder`][crate::decoder::Decoder]. Packets are
//! represented as already parsed records. Extracting them from the raw trace
//! bitstream is not a concern of this crate.
//!
//! With the `serde` feature, all types may be (de)serialized. Single bit
//! flags are represented as `0` or `1`, as in the packet's encoding.

use core::fmt;

#[cfg(feature = "serde")]
use crate::config::serde_utils::Flag;


/// Instruction trace packet
///
/// Represents a `te_inst` packet. The variant corresponds to the packet's
/// format.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "format"))]
pub enum InstructionTrace {
    /// Format 0: optional efficiency extensions
    ///
    /// The [`Decoder`][crate::decoder::Decoder] does not make use of any
    /// extension. After synchronization, these packets merely trigger a replay
    /// toward the last reported address.
    Extension,
    /// Format 1: branch map, optionally with an address
    Branch(Branch),
    /// Format 2: address only
    Address(AddressInfo),
    /// Format 3: synchronization
    Synchronization(Synchronization),
}

impl InstructionTrace {
    /// Retrieve the numeric packet format
    pub fn format(&self) -> u8 {
        match self {
            Self::Extension => 0,
            Self::Branch(_) => 1,
            Self::Address(_) => 2,
            Self::Synchronization(_) => 3,
        }
    }

    /// Retrieve the [`AddressInfo`] carried by this packet, if any
    pub fn get_address_info(&self) -> Option<&AddressInfo> {
        match self {
            Self::Branch(b) => b.address.as_ref(),
            Self::Address(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Branch> for InstructionTrace {
    fn from(branch: Branch) -> Self {
        Self::Branch(branch)
    }
}

impl From<AddressInfo> for InstructionTrace {
    fn from(addr: AddressInfo) -> Self {
        Self::Address(addr)
    }
}

impl From<Synchronization> for InstructionTrace {
    fn from(sync: Synchronization) -> Self {
        Self::Synchronization(sync)
    }
}

impl fmt::Display for InstructionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension => write!(f, "EXT"),
            Self::Branch(b) => write!(f, "BRANCH {b}"),
            Self::Address(a) => write!(f, "ADDR {a}"),
            Self::Synchronization(s) => write!(f, "SYNC {s}"),
        }
    }
}

/// Branch payload
///
/// Represents a format 1 packet. This packet includes branch information. It is
/// sent by the encoder when either the branch information must be reported (for
/// example because the branch map is full), or when the address of an
/// instruction must be reported, and there has been at least one branch since
/// the previous packet.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Branch {
    /// Number of valid bits in the `branch_map`
    ///
    /// A value of `0` denotes a full branch map of
    /// [`FULL_PACKET_BRANCHES`][crate::types::branch::Map::FULL_PACKET_BRANCHES]
    /// branches without an address.
    pub branches: u8,
    /// Branch outcomes, oldest in bit 0
    ///
    /// Set bits represent branches not taken, unset bits taken ones.
    pub branch_map: u32,
    /// Reported address, absent for a full branch map
    #[cfg_attr(feature = "serde", serde(default))]
    pub address: Option<AddressInfo>,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "branches: {}, map: {:b}", self.branches, self.branch_map)?;
        if let Some(address) = self.address {
            write!(f, ", {address}")?;
        }
        Ok(())
    }
}

/// Address info payload
///
/// Represents a format 2 packet. This payload contains only an instruction
/// address. The address is differential (i.e. relative to the last reported
/// address) unless full address mode is enabled. It is also used as part of
/// format 1 packets.
///
/// The address does not include the lowest
/// [`iaddress_lsb`][crate::config::Capabilities::iaddress_lsb] bits.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressInfo {
    /// Instruction address, sign extended
    pub address: i64,
    /// An uninferable discontinuity occured before a sync event
    ///
    /// If `true`, this packet is reporting the instruction following an
    /// uninferable discontinuity and is also the instruction before an
    /// exception, privilege change or resync (i.e. it will be followed
    /// immediately by a format 3 packet). This is the already resolved flag,
    /// i.e. the raw bit differs from the address' most significant bit.
    #[cfg_attr(feature = "serde", serde(default, with = "Flag"))]
    pub updiscon: bool,
}

impl fmt::Display for AddressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "address: {:0x}", self.address as u64)?;
        if self.address < 0
            && let Some(addr) = self.address.checked_neg()
        {
            write!(f, " (-{addr:x})")?;
        }
        if self.updiscon {
            write!(f, ", updiscon")?;
        }
        Ok(())
    }
}

/// Synchronization payload
///
/// Represents a format 3 packet of subformat 0, 1 or 2. It reports a full
/// address, which is the address of the instruction retired next.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Synchronization {
    /// Kind of synchronization
    pub subformat: Subformat,
    /// Whether the branch at `address` was not taken
    ///
    /// This is only relevant if the instruction at `address` is a branch.
    /// Like bits in branch maps, `false` indicates that it was taken.
    #[cfg_attr(feature = "serde", serde(with = "Flag"))]
    pub branch: bool,
    /// Full instruction address
    pub address: u64,
}

impl fmt::Display for Synchronization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} address: {:0x}", self.subformat, self.address)?;
        if !self.branch {
            write!(f, ", branch taken")?;
        }
        Ok(())
    }
}

/// Subformat of a [`Synchronization`]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subformat {
    /// Start of tracing, or resync
    #[default]
    Start,
    /// Exception or interrupt
    Trap,
    /// Context change
    Context,
}

impl TryFrom<u8> for Subformat {
    type Error = u8;

    fn try_from(num: u8) -> Result<Self, Self::Error> {
        match num {
            0 => Ok(Self::Start),
            1 => Ok(Self::Trap),
            2 => Ok(Self::Context),
            e => Err(e),
        }
    }
}

impl From<Subformat> for u8 {
    fn from(subformat: Subformat) -> Self {
        match subformat {
            Subformat::Start => 0,
            Subformat::Trap => 1,
            Subformat::Context => 2,
        }
    }
}

/// Supporting information for the decoder
///
/// Represents a format 3, subformat 3 packet or a `te_support` message.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Support {
    /// Type of the support message
    ///
    /// Only type `0` carries information relevant for instruction trace.
    pub support_type: u8,
    /// Change to filter qualification
    pub qual_status: QualStatus,
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SUPPORT type: {}, {:?}", self.support_type, self.qual_status)
    }
}

/// Representation of a change to the filter qualification
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QualStatus {
    /// No change to filter qualification.
    #[default]
    NoChange,
    /// Qualification ended, preceding packet sent explicitly to indicate last
    /// qualification instruction.
    EndedRep,
    /// One or more instruction trace packets lost.
    TraceLost,
    /// Qualification ended, preceding packet would have been sent anyway due to
    /// an updiscon, even if it wasn’t the last qualified instruction
    EndedNtr,
}

impl TryFrom<u8> for QualStatus {
    type Error = u8;

    fn try_from(num: u8) -> Result<Self, Self::Error> {
        match num {
            0b00 => Ok(Self::NoChange),
            0b01 => Ok(Self::EndedRep),
            0b10 => Ok(Self::TraceLost),
            0b11 => Ok(Self::EndedNtr),
            e => Err(e),
        }
    }
}

impl From<QualStatus> for u8 {
    fn from(status: QualStatus) -> Self {
        match status {
            QualStatus::NoChange => 0b00,
            QualStatus::EndedRep => 0b01,
            QualStatus::TraceLost => 0b10,
            QualStatus::EndedNtr => 0b11,
        }
    }
}
