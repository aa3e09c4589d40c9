// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Configuration and utilities

#[cfg(feature = "serde")]
pub mod serde_utils;

/// Maximum number of return addresses the [`Decoder`][crate::Decoder] keeps
///
/// The effective depth of the return stack is derived from
/// [`Capabilities::call_counter_width`] but never exceeds this value.
pub const MAX_CALL_DEPTH: usize = 512;

/// Encoder capabilities
///
/// Capabilities are obtained from the encoder through discovery, i.e. through
/// means other than instruction trace packets. They are fixed for the lifetime
/// of a [`Decoder`][crate::Decoder].
///
/// The [`Default`] value is the all-zero record. It does not reflect any
/// particular encoder, and users are expected to supply the values their
/// encoder reports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Capabilities {
    /// Width of the encoder's call counter
    ///
    /// The decoder keeps up to `1 << (call_counter_width + 2)` return
    /// addresses, bounded by [`MAX_CALL_DEPTH`].
    pub call_counter_width: u8,
    /// Number of low address bits not transmitted in packets
    ///
    /// This is `1` for encoders supporting compressed instructions.
    pub iaddress_lsb: u8,
    /// Addresses in packets are absolute rather than differential
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub full_address: bool,
    /// The encoder omits return addresses predictable via a call stack
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub implicit_return: bool,
}

impl Capabilities {
    /// Retrieve the [`AddressMode`] these capabilities imply
    pub fn address_mode(&self) -> AddressMode {
        AddressMode::from_full(self.full_address)
    }

    /// Retrieve the depth of the return stack
    pub fn return_stack_depth(&self) -> usize {
        1usize
            .checked_shl(u32::from(self.call_counter_width) + 2)
            .unwrap_or(usize::MAX)
            .min(MAX_CALL_DEPTH)
    }

    /// Reconstruct a full instruction address from its packet representation
    pub fn expand_address(&self, address: u64) -> u64 {
        address.checked_shl(self.iaddress_lsb.into()).unwrap_or(0)
    }
}

/// Address mode
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AddressMode {
    /// Any addresses is assumed to be a full, absolute addresses
    Full,
    /// An addresses is assumed to be relative to the previous address
    #[default]
    Delta,
}

impl AddressMode {
    /// Create an address mode from a [`bool`] indicating full address mode
    pub const fn from_full(full: bool) -> Self {
        if full { Self::Full } else { Self::Delta }
    }
}
