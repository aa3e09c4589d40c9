// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Branch map utilities

/// A record of branches that are taken or not taken
///
/// The map holds the outcomes of conditional branches which were reported by
/// the encoder but not yet matched with a retired branch instruction. The
/// lowest valued bit corresponds to the oldest branch. Set bits represent
/// branches not taken, unset bits represent taken branches.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct Map {
    count: u8,
    map: u64,
}

impl Map {
    /// Maximum number of branches a branch map can hold
    pub const MAX_BRANCHES: u8 = 32;

    /// Number of branches a full branch map packet reports
    pub const FULL_PACKET_BRANCHES: u8 = 31;

    /// Create a new branch map holding the lowest `count` bits of `map`
    ///
    /// Returns an error if `count` exceeds [`MAX_BRANCHES`][Self::MAX_BRANCHES].
    pub fn new(count: u8, map: u64) -> Result<Self, Error> {
        if count > Self::MAX_BRANCHES {
            return Err(Error::TooManyBranches);
        }
        Ok(Self {
            count,
            map: map & low_mask(count),
        })
    }

    /// Remove the oldest branch information and return whether it was taken
    ///
    /// Returns `None` if the map is empty.
    pub fn pop_taken(&mut self) -> Option<bool> {
        let count = self.count.checked_sub(1)?;
        let taken = self.map & 1 == 0;

        self.map >>= 1;
        self.count = count;

        Some(taken)
    }

    /// Push a new branch outcome as the newest entry
    pub fn push_branch_taken(&mut self, taken: bool) -> Result<(), Error> {
        self.append(Self::new(1, (!taken).into())?)
    }

    /// Append another branch map to this one
    ///
    /// The branches from the other map are considered newer than the existing
    /// ones.
    pub fn append(&mut self, other: Self) -> Result<(), Error> {
        let total = self
            .count
            .checked_add(other.count)
            .filter(|c| *c <= Self::MAX_BRANCHES)
            .ok_or(Error::TooManyBranches)?;
        self.map |= other.map << self.count;
        self.count = total;
        Ok(())
    }

    /// Forget all branches
    pub fn clear(&mut self) {
        *self = Default::default();
    }

    /// Retrieve the number of branches in the map
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Check whether the map holds no branches
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Retrieve the raw contents of the map
    ///
    /// Only the lowest [`count`][Self::count] bits are meaningful.
    pub fn raw_map(&self) -> u64 {
        self.map
    }
}

fn low_mask(count: u8) -> u64 {
    1u64.checked_shl(count.into()).map(|b| b - 1).unwrap_or(u64::MAX)
}

/// Errors produced by [`Map`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The result would exceed the maximum number of branches a map may hold
    #[error("Too many branches")]
    TooManyBranches,
}
