// Copyright 2026 The crap-clone Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Monotone mark identifiers for fast-import blob and commit records.
//!
//! The original design compares a mutable integer field against a sentinel
//! `UNSET` value; here the sentinel is encoded in a `Option<Mark>` at every
//! API boundary (Design Note 9), and `MarkAllocator` is the sole source of
//! fresh marks, mirroring the "explicit monotonic id generator owned by the
//! Emitter" call-out.

use std::fmt;

/// A fast-import mark, written on the wire as `:N`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark(u64);

impl Mark {
    /// Returns the numeric value written after the `:` on the wire.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// Hands out fresh, strictly increasing [`Mark`]s. Owned by the Emitter and
/// threaded through the Fetch Optimizer so every blob and commit gets a
/// unique id (Design Note: "Global mark counter").
#[derive(Debug, Default)]
pub struct MarkAllocator {
    next: u64,
}

impl MarkAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocates the next mark. Never reuses a previously issued value.
    pub fn allocate(&mut self) -> Mark {
        let mark = Mark(self.next);
        self.next += 1;
        mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotone_and_starts_at_one() {
        let mut alloc = MarkAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a.value(), 1);
        assert_eq!(b.value(), 2);
        assert_eq!(format!("{a}"), ":1");
    }
}
