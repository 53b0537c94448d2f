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

//! The in-memory store of files, versions, tags, branches and changesets
//! (spec §3). Re-architected per Design Note 9 as typed arenas owned by
//! [`Database`], with [`FileId`]/[`VersionId`]/[`TagId`]/[`ChangesetId`]
//! handles standing in for the source's intrusive, cycle-forming pointers.

use crate::error::CoreError;
use crate::error::CoreResult;
use crate::ids::ChangesetId;
use crate::ids::FileId;
use crate::ids::TagId;
use crate::ids::VersionId;
use crate::mark::Mark;
use crate::tag::TagKind;
use crate::time::Timestamp;

/// A file in the CVS repository, identified by its path. Created once at
/// log-parse time and immutable thereafter (spec §3 "File").
#[derive(Debug)]
pub struct File {
    pub path: String,
    pub versions: Vec<VersionId>,
}

/// One revision of a [`File`] (spec §3 "Version").
#[derive(Debug)]
pub struct Version {
    pub file: FileId,
    /// Dotted numeric revision string, e.g. `"1.3.2.1"`.
    pub revision: String,
    pub timestamp: Timestamp,
    pub author: String,
    pub log: String,
    pub dead: bool,
    pub executable: bool,
    pub parent: Option<VersionId>,
    pub branch: TagId,
    /// Normalizes a vendor-branch revision back onto the trunk it was
    /// imported into (spec §3, glossary `version_normalise`).
    pub implicit_merge: Option<VersionId>,
    pub mark: Option<Mark>,
    /// Back-edge to the changeset this version was grouped into, set by the
    /// Changeset Builder.
    pub changeset: Option<ChangesetId>,
}


/// Owns every [`File`], [`Version`], [`crate::tag::Tag`] and
/// [`crate::changeset::Changeset`] for the process lifetime (spec §3
/// "Ownership"). Mutated exclusively by the current phase
/// (parser → builder → analyzer → scheduler); no phase overlaps (spec §5).
#[derive(Debug, Default)]
pub struct Database {
    files: Vec<File>,
    versions: Vec<Version>,
    pub(crate) tags: Vec<crate::tag::Tag>,
    pub(crate) changesets: Vec<crate::changeset::Changeset>,
}

impl Database {
    pub fn new() -> Self {
        let mut db = Self::default();
        // The trunk is always tag id 0: an unnamed branch with no parent.
        db.tags.push(crate::tag::Tag::new_branch(String::new(), 0));
        db
    }

    pub fn trunk(&self) -> TagId {
        TagId::from_index(0)
    }

    pub fn add_file(&mut self, path: String) -> FileId {
        let id = FileId::from_index(self.files.len());
        self.files.push(File {
            path,
            versions: Vec::new(),
        });
        let file_count = self.files.len();
        for tag in &mut self.tags {
            if tag.kind == TagKind::Branch {
                tag.grow_branch_versions(file_count);
            }
        }
        id
    }

    pub fn add_version(
        &mut self,
        file: FileId,
        revision: String,
        timestamp_secs: i64,
        author: String,
        log: String,
        dead: bool,
        executable: bool,
        parent: Option<VersionId>,
        branch: TagId,
    ) -> CoreResult<VersionId> {
        let timestamp = Timestamp::from_log_seconds(timestamp_secs).ok_or_else(|| {
            CoreError::Malformed(format!(
                "timestamp {timestamp_secs} for {revision} is out of range"
            ))
        })?;
        let id = VersionId::from_index(self.versions.len());
        self.versions.push(Version {
            file,
            revision,
            timestamp,
            author,
            log,
            dead,
            executable,
            parent,
            branch,
            implicit_merge: None,
            mark: None,
            changeset: None,
        });
        self.files[file.index()].versions.push(id);
        Ok(id)
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.index()]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &File)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId::from_index(i), f))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn version(&self, id: VersionId) -> &Version {
        &self.versions[id.index()]
    }

    pub fn version_mut(&mut self, id: VersionId) -> &mut Version {
        &mut self.versions[id.index()]
    }

    pub fn versions(&self) -> impl Iterator<Item = (VersionId, &Version)> {
        self.versions
            .iter()
            .enumerate()
            .map(|(i, v)| (VersionId::from_index(i), v))
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// `version_normalise`: resolves `id` through its chain of
    /// `implicit_merge` pointers to the canonical representative of that
    /// revision.
    pub fn normalise(&self, id: VersionId) -> VersionId {
        match self.version(id).implicit_merge {
            Some(canonical) => self.normalise(canonical),
            None => id,
        }
    }

    /// `version_live`: `version_normalise` composed with the dead-check,
    /// returning `None` for tombstones.
    pub fn version_live(&self, id: VersionId) -> Option<VersionId> {
        let canonical = self.normalise(id);
        if self.version(canonical).dead {
            None
        } else {
            Some(canonical)
        }
    }

    pub fn add_tag(&mut self, tag: crate::tag::Tag) -> TagId {
        let id = TagId::from_index(self.tags.len());
        self.tags.push(tag);
        id
    }

    pub fn tag(&self, id: TagId) -> &crate::tag::Tag {
        &self.tags[id.index()]
    }

    pub fn tag_mut(&mut self, id: TagId) -> &mut crate::tag::Tag {
        &mut self.tags[id.index()]
    }

    pub fn tags(&self) -> impl Iterator<Item = (TagId, &crate::tag::Tag)> {
        self.tags
            .iter()
            .enumerate()
            .map(|(i, t)| (TagId::from_index(i), t))
    }

    pub fn branches(&self) -> impl Iterator<Item = (TagId, &crate::tag::Tag)> {
        self.tags().filter(|(_, t)| t.kind == TagKind::Branch)
    }

    pub fn add_changeset(&mut self, changeset: crate::changeset::Changeset) -> ChangesetId {
        let id = ChangesetId::from_index(self.changesets.len());
        self.changesets.push(changeset);
        id
    }

    pub fn changeset(&self, id: ChangesetId) -> &crate::changeset::Changeset {
        &self.changesets[id.index()]
    }

    pub fn changeset_mut(&mut self, id: ChangesetId) -> &mut crate::changeset::Changeset {
        &mut self.changesets[id.index()]
    }

    pub fn changesets(&self) -> impl Iterator<Item = (ChangesetId, &crate::changeset::Changeset)> {
        self.changesets
            .iter()
            .enumerate()
            .map(|(i, c)| (ChangesetId::from_index(i), c))
    }

    pub fn changeset_count(&self) -> usize {
        self.changesets.len()
    }
}
