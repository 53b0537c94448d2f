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

//! A small `Arc<str>` interning cache (SPEC_FULL.md §6 "Interner"): author
//! names, log messages and branch/tag names repeat constantly across an
//! rlog response, so they're stored once and shared by reference.

use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Interner {
    seen: HashSet<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the interned `Arc<str>` equal to `value`, inserting it first
    /// if this is the first time it's been seen.
    pub fn intern(&mut self, value: &str) -> Arc<str> {
        if let Some(existing) = self.seen.get(value) {
            return Arc::clone(existing);
        }
        let arc: Arc<str> = Arc::from(value);
        self.seen.insert(Arc::clone(&arc));
        arc
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_values_share_one_allocation() {
        let mut interner = Interner::new();
        let a = interner.intern("trunk");
        let b = interner.intern("trunk");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn distinct_values_get_distinct_entries() {
        let mut interner = Interner::new();
        interner.intern("alice");
        interner.intern("bob");
        assert_eq!(interner.len(), 2);
    }
}
