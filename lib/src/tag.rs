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

//! [`Tag`]: a symbolic name, CVS tag or branch (spec §3 "Tag").

use crate::fixup::FixupVersion;
use crate::ids::ChangesetId;
use crate::ids::FileId;
use crate::ids::VersionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Tag,
    Branch,
}

/// The per-file version a [`Tag`] points at: either an explicit entry in the
/// tag's own file list, or (for a branch) inferred from the revision tree.
#[derive(Debug, Clone, Copy)]
pub struct TagFile {
    pub file: FileId,
    pub version: VersionId,
}

/// A symbolic name (spec §3 "Tag"). The empty name denotes the trunk.
#[derive(Debug)]
pub struct Tag {
    pub name: String,
    pub kind: TagKind,
    pub tag_files: Vec<TagFile>,
    pub parent: Option<ChangesetId>,
    pub is_released: bool,
    pub fixup: bool,
    /// Most recent commit landed on this branch. `None` until the Scheduler
    /// emits the first commit that touches it.
    pub last: Option<ChangesetId>,
    /// One slot per `File` in the `Database`, holding the live version
    /// currently at this branch's tip. Empty (and unused) for tag-kind
    /// entries, which borrow their identity from `tag_files` instead.
    pub branch_versions: Vec<Option<VersionId>>,
    /// Branch-kind only: fixups the Planner found due but whose `time`
    /// exceeded the scheduler time at the branch's own `reset` (spec §4.5's
    /// incremental-application clause). Drained into a fix-up commit before
    /// the next real commit on this branch, or at run finalization if none
    /// follows.
    pub pending_fixups: Vec<FixupVersion>,
}

impl Tag {
    pub fn new_branch(name: String, file_count: usize) -> Self {
        Self {
            name,
            kind: TagKind::Branch,
            tag_files: Vec::new(),
            parent: None,
            is_released: false,
            fixup: false,
            last: None,
            branch_versions: vec![None; file_count],
            pending_fixups: Vec::new(),
        }
    }

    pub fn new_tag(name: String) -> Self {
        Self {
            name,
            kind: TagKind::Tag,
            tag_files: Vec::new(),
            parent: None,
            is_released: false,
            fixup: false,
            last: None,
            branch_versions: Vec::new(),
            pending_fixups: Vec::new(),
        }
    }

    /// Grows `branch_versions` to cover newly registered files, defaulting
    /// new slots to "absent" (dead). Called when the Database learns of a
    /// `File` after this branch already exists.
    pub fn grow_branch_versions(&mut self, file_count: usize) {
        if self.branch_versions.len() < file_count {
            self.branch_versions.resize(file_count, None);
        }
    }
}
