// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Return stack utiltities for infering function returns

use crate::config::MAX_CALL_DEPTH;

/// Shadow call stack of return addresses
///
/// The stack keeps its data in an array of [`MAX_CALL_DEPTH`] entries but
/// only ever holds up to a maximum depth chosen at construction. Pushing onto
/// a full stack evicts the bottom (oldest) address.
#[derive(Clone, Debug)]
pub struct ReturnStack {
    data: [u64; MAX_CALL_DEPTH],
    max_depth: usize,
    depth: usize,
    base: usize,
}

impl ReturnStack {
    /// Create a new, empty return stack with the given maximum depth
    ///
    /// Depths exceeding [`MAX_CALL_DEPTH`] are clamped.
    pub fn new(max_depth: usize) -> Self {
        Self {
            data: [0; MAX_CALL_DEPTH],
            max_depth: max_depth.min(MAX_CALL_DEPTH),
            depth: 0,
            base: 0,
        }
    }

    /// Push a new return address on the stack
    ///
    /// If the maximal depth is reached, the bottom address will be evicted from
    /// the stack and thus no longer be obtainable via a [`pop`][Self::pop].
    pub fn push(&mut self, addr: u64) {
        if self.max_depth == 0 {
            return;
        }

        self.data[(self.base + self.depth) % MAX_CALL_DEPTH] = addr;
        if self.depth < self.max_depth {
            self.depth += 1;
        } else {
            self.base = (self.base + 1) % MAX_CALL_DEPTH;
        }
    }

    /// Retrieve and remove the topmost return address
    pub fn pop(&mut self) -> Option<u64> {
        self.depth = self.depth.checked_sub(1)?;
        Some(self.data[(self.base + self.depth) % MAX_CALL_DEPTH])
    }

    /// Retrieve the topmost return address without removing it
    pub fn peek(&self) -> Option<u64> {
        let top = self.depth.checked_sub(1)?;
        Some(self.data[(self.base + top) % MAX_CALL_DEPTH])
    }

    /// Remove all return addresses
    pub fn clear(&mut self) {
        self.depth = 0;
        self.base = 0;
    }

    /// Get the current stack depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Get the maximum stack depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Check whether the stack holds no return addresses
    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Iterate over the return addresses, from the bottom to the top
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.depth).map(|i| self.data[(self.base + i) % MAX_CALL_DEPTH])
    }
}

impl Default for ReturnStack {
    fn default() -> Self {
        Self::new(0)
    }
}
