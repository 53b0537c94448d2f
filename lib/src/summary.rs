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

//! Run-wide counters surfaced in the final stderr summary line (spec §6
//! "Standard error"). Accumulated by the Scheduler/Emitter as they run and
//! printed once, by the CLI, after `progress done`.

use std::fmt;

/// Counters accumulated over one full conversion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub exact_tags: u32,
    pub fixup_tags: u32,
    pub exact_branches: u32,
    pub fixup_branches: u32,
    pub transactions: u32,
    pub versions_fetched: u32,
    pub duplicate_blobs: u32,
    /// No-op commits collapsed into their branch's prior mark (SPEC_FULL.md
    /// §9.3): not written to the stream, but still worth reporting.
    pub noop_commits_collapsed: u32,
}

impl RunSummary {
    pub fn record_tag(&mut self, needed_fixup: bool) {
        if needed_fixup {
            self.fixup_tags += 1;
        } else {
            self.exact_tags += 1;
        }
    }

    pub fn record_branch(&mut self, needed_fixup: bool) {
        if needed_fixup {
            self.fixup_branches += 1;
        } else {
            self.exact_branches += 1;
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transactions, {} versions fetched, {} tags ({} exact, {} fix-up), \
             {} branches ({} exact, {} fix-up), {} duplicate blob(s) discarded, \
             {} no-op commit(s) collapsed",
            self.transactions,
            self.versions_fetched,
            self.exact_tags + self.fixup_tags,
            self.exact_tags,
            self.fixup_tags,
            self.exact_branches + self.fixup_branches,
            self.exact_branches,
            self.fixup_branches,
            self.duplicate_blobs,
            self.noop_commits_collapsed,
        )
    }
}
