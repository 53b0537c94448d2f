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

//! The Branch/Tag Analyzer (spec §4.2): assigns each [`crate::tag::Tag`] a
//! parent [`crate::changeset::Changeset`] and sets up the children back-edges
//! the Scheduler walks.

use std::collections::HashMap;

use crate::changeset::ChangesetKind;
use crate::database::Database;
use crate::ids::ChangesetId;
use crate::ids::FileId;
use crate::ids::VersionId;
use crate::ids::TagId;

/// For tag `tag_id`, the version each file in the database is pinned to, as
/// an explicit `tag_files` entry.
fn tag_version_map(db: &Database, tag_id: TagId) -> HashMap<FileId, VersionId> {
    db.tag(tag_id)
        .tag_files
        .iter()
        .map(|tf| (tf.file, tf.version))
        .collect()
}

/// Counts how many of `pinned`'s files mismatch the live state recorded in
/// `snapshot` (one slot per file, as produced by [`commit_snapshots`]).
fn mismatches(
    db: &Database,
    pinned: &HashMap<FileId, VersionId>,
    snapshot: &[Option<VersionId>],
) -> usize {
    pinned
        .iter()
        .filter(|&(&file, &version)| {
            let live_here = snapshot.get(file.index()).copied().flatten();
            db.version_live(version) != live_here
        })
        .count()
}

/// Replays every `commit`-kind changeset across all branches in ascending
/// timestamp order, snapshotting the touched branch's live file state after
/// each one. This lets the Analyzer score "what did the repository look
/// like right after commit C" for any C, without having run the Scheduler.
pub(crate) fn commit_snapshots(db: &Database) -> Vec<(ChangesetId, Vec<Option<VersionId>>)> {
    let mut commits: Vec<ChangesetId> = db
        .changesets()
        .filter(|(_, c)| c.kind == ChangesetKind::Commit)
        .map(|(id, _)| id)
        .collect();
    commits.sort_by_key(|&id| db.changeset(id).timestamp);

    let mut state_by_branch: HashMap<TagId, Vec<Option<VersionId>>> = HashMap::new();
    let mut snapshots = Vec::with_capacity(commits.len());
    for id in commits {
        let changeset = db.changeset(id);
        let branch = changeset.branch;
        let state = state_by_branch
            .entry(branch)
            .or_insert_with(|| vec![None; db.file_count()]);
        for &member in &changeset.members {
            let version = db.version(member);
            state[version.file.index()] = db.version_live(member);
        }
        snapshots.push((id, state.clone()));
    }
    snapshots
}

/// Assigns `tag.parent` for every tag/branch in `db` and records children
/// back-edges on the chosen parent changeset (spec §4.2). A tag with no
/// pinned files (nothing to match against) or with no commit yet on record
/// gets `parent = None`, the synthetic-root case from spec §7.
pub fn analyze(db: &mut Database) {
    let snapshots = commit_snapshots(db);
    let tag_ids: Vec<TagId> = db.tags().map(|(id, _)| id).collect();
    let mut assignments: Vec<(TagId, Option<ChangesetId>)> = Vec::with_capacity(tag_ids.len());

    for tag_id in tag_ids {
        if tag_id == db.trunk() {
            assignments.push((tag_id, None));
            continue;
        }
        let pinned = tag_version_map(db, tag_id);
        if pinned.is_empty() || snapshots.is_empty() {
            assignments.push((tag_id, None));
            continue;
        }

        let best = snapshots
            .iter()
            .map(|(id, state)| (*id, mismatches(db, &pinned, state)))
            .min_by(|(id_a, mismatch_a), (id_b, mismatch_b)| {
                mismatch_a.cmp(mismatch_b).then_with(|| {
                    // Ties broken toward the latest timestamp.
                    db.changeset(*id_b)
                        .timestamp
                        .cmp(&db.changeset(*id_a).timestamp)
                })
            });

        assignments.push((tag_id, best.map(|(id, _)| id)));
    }

    for (tag_id, parent) in &assignments {
        db.tag_mut(*tag_id).parent = *parent;
    }

    // Wire up children back-edges: each tag/branch changeset's parent gains
    // it as a child, so the Scheduler can decrement `unready_count`.
    for (tag_id, parent_changeset) in assignments {
        let Some(parent_changeset) = parent_changeset else {
            continue;
        };
        let tag_changeset = db
            .changesets()
            .find(|(_, c)| c.tag == Some(tag_id))
            .map(|(id, _)| id);
        if let Some(tag_changeset) = tag_changeset {
            db.changeset_mut(parent_changeset).children.push(tag_changeset);
        }
    }

    recompute_unready_counts(db);
}

/// Derives every changeset's `unready_count` from the children edges set up
/// above, plus the implicit "a commit depends on the previous commit on its
/// own branch" ordering the Scheduler needs (spec §4.3 "A commit precedes
/// every commit causally downstream of it on the same branch", spec §5).
fn recompute_unready_counts(db: &mut Database) {
    let changeset_ids: Vec<ChangesetId> = db.changesets().map(|(id, _)| id).collect();
    for &id in &changeset_ids {
        db.changeset_mut(id).unready_count = 0;
    }

    // Same-branch commit ordering: chain each branch's commits by ascending
    // timestamp, each one a child of the previous.
    let branch_ids: Vec<TagId> = db.tags().map(|(id, _)| id).collect();
    for branch in branch_ids {
        let mut commits: Vec<ChangesetId> = db
            .changesets()
            .filter(|(_, c)| c.kind == ChangesetKind::Commit && c.branch == branch)
            .map(|(id, _)| id)
            .collect();
        commits.sort_by_key(|&id| db.changeset(id).timestamp);
        for pair in commits.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            db.changeset_mut(prev).children.push(next);
        }
    }

    for &id in &changeset_ids {
        let children = db.changeset(id).children.clone();
        for child in children {
            db.changeset_mut(child).unready_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::build_changesets;
    use crate::tag::Tag;
    use crate::tag::TagFile;

    fn add(db: &mut Database, file: FileId, rev: &str, t: i64, author: &str, log: &str) -> VersionId {
        let trunk = db.trunk();
        db.add_version(
            file,
            rev.to_owned(),
            t,
            author.to_owned(),
            log.to_owned(),
            false,
            false,
            None,
            trunk,
        )
        .unwrap()
    }

    #[test]
    fn tag_aliasing_a_real_commit_has_zero_mismatches() {
        let mut db = Database::new();
        let a = db.add_file("a".to_owned());
        let _v1 = add(&mut db, a, "1.1", 100, "x", "init");
        let v2 = add(&mut db, a, "1.2", 200, "x", "edit");

        let tag_id = db.add_tag(Tag::new_tag("T1".to_owned()));
        db.tag_mut(tag_id).tag_files.push(TagFile { file: a, version: v2 });

        build_changesets(&mut db, 300);
        analyze(&mut db);

        let parent = db.tag(tag_id).parent.expect("tag should find a parent");
        let parent_changeset = db.changeset(parent);
        assert!(parent_changeset.members.contains(&v2));
    }

    #[test]
    fn tag_on_same_branch_aliases_the_latest_matching_commit() {
        let mut db = Database::new();
        let a = db.add_file("a".to_owned());
        let b = db.add_file("b".to_owned());
        let va = add(&mut db, a, "1.1", 100, "x", "a-msg");
        let vb = add(&mut db, b, "1.1", 500, "y", "b-msg");

        let tag_id = db.add_tag(Tag::new_tag("T2".to_owned()));
        db.tag_mut(tag_id).tag_files.push(TagFile { file: a, version: va });
        db.tag_mut(tag_id).tag_files.push(TagFile { file: b, version: vb });

        build_changesets(&mut db, 300);
        analyze(&mut db);

        let parent = db.tag(tag_id).parent.expect("tag should find a parent");
        let parent_changeset = db.changeset(parent);
        // Both files live on the trunk, so the branch's cumulative state
        // after the later commit (b-msg) already matches the tag exactly:
        // the Analyzer should prefer it over the earlier a-msg commit, which
        // only matches one of the two pinned files.
        assert!(parent_changeset.members.contains(&vb));
    }
}
