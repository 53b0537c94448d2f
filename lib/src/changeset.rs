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

//! The Changeset Builder (spec §4.1): clusters file revisions sharing
//! author, log message and branch into atomic [`Changeset`]s.

use crate::database::Database;
use crate::ids::ChangesetId;
use crate::ids::TagId;
use crate::ids::VersionId;
use crate::mark::Mark;
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangesetKind {
    /// A `tag`/`branch` changeset sorts before a `commit` changeset at equal
    /// timestamp (spec §4.3).
    Tag,
    Branch,
    Commit,
}

/// A cluster of [`crate::database::Version`]s sharing author, log message
/// and branch, with timestamps within the configured coalescing window
/// (spec §3 "Changeset").
#[derive(Debug)]
pub struct Changeset {
    pub kind: ChangesetKind,
    pub branch: TagId,
    pub timestamp: Timestamp,
    pub members: Vec<VersionId>,
    /// Incoming unresolved dependency count, maintained by the Analyzer and
    /// decremented by the Scheduler.
    pub unready_count: u32,
    pub children: Vec<ChangesetId>,
    pub mark: Option<Mark>,
    /// Set for a `Tag`/`Branch`-kind changeset: which symbolic name it
    /// represents.
    pub tag: Option<TagId>,
}

impl Changeset {
    pub fn is_noop_candidate(&self) -> bool {
        self.kind == ChangesetKind::Commit && self.members.is_empty()
    }
}

/// Clusters every `Version` in `db` into `commit`-kind changesets (spec
/// §4.1), then adds one `tag`/`branch`-kind changeset (with an empty member
/// set) per `Tag` already registered in the database. Returns nothing: the
/// resulting changesets are appended to `db` and each clustered version's
/// `changeset` back-edge is set.
pub fn build_changesets(db: &mut Database, coalesce_window_secs: i64) {
    let mut order: Vec<VersionId> = db.versions().map(|(id, _)| id).collect();
    order.sort_by_key(|&id| {
        let v = db.version(id);
        (
            v.branch,
            v.author.clone(),
            v.log.clone(),
            v.timestamp,
        )
    });

    let mut cluster: Vec<VersionId> = Vec::new();
    let mut cluster_files: std::collections::HashSet<crate::ids::FileId> =
        std::collections::HashSet::new();
    let mut cluster_key: Option<(TagId, String, String)> = None;
    let mut cluster_last_time: Option<Timestamp> = None;

    let mut flush = |db: &mut Database, cluster: &mut Vec<VersionId>| {
        if cluster.is_empty() {
            return;
        }
        let max_ts = cluster
            .iter()
            .map(|&id| db.version(id).timestamp)
            .fold(Timestamp::new(i64::MIN + 1), Timestamp::max);
        let branch = db.version(cluster[0]).branch;
        let id = db.add_changeset(Changeset {
            kind: ChangesetKind::Commit,
            branch,
            timestamp: max_ts,
            members: cluster.clone(),
            unready_count: 0,
            children: Vec::new(),
            mark: None,
            tag: None,
        });
        for &member in cluster.iter() {
            db.version_mut(member).changeset = Some(id);
        }
        cluster.clear();
    };

    for id in order {
        let v = db.version(id);
        let key = (v.branch, v.author.clone(), v.log.clone());
        let timestamp = v.timestamp;
        let file = v.file;

        let gap_too_large = cluster_last_time
            .is_some_and(|last| (timestamp.seconds() - last.seconds()) > coalesce_window_secs);
        let key_changed = cluster_key.as_ref() != Some(&key);
        let duplicate_file_in_cluster = cluster_files.contains(&file);

        if key_changed || gap_too_large || duplicate_file_in_cluster {
            flush(db, &mut cluster);
            cluster_files.clear();
            cluster_key = Some(key);
        }

        cluster.push(id);
        cluster_files.insert(file);
        cluster_last_time = Some(timestamp);
    }
    flush(db, &mut cluster);

    let tag_ids: Vec<TagId> = db.tags().map(|(id, _)| id).collect();
    for tag_id in tag_ids {
        let tag = db.tag(tag_id);
        let kind = match tag.kind {
            crate::tag::TagKind::Tag => ChangesetKind::Tag,
            crate::tag::TagKind::Branch => ChangesetKind::Branch,
        };
        db.add_changeset(Changeset {
            kind,
            branch: tag_id,
            timestamp: Timestamp::new(i64::MIN + 1),
            members: Vec::new(),
            unready_count: 0,
            children: Vec::new(),
            mark: None,
            tag: Some(tag_id),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(db: &mut Database, file: crate::ids::FileId, rev: &str, t: i64, author: &str, log: &str) {
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
        .unwrap();
    }

    #[test]
    fn two_files_same_author_and_log_cluster_together() {
        let mut db = Database::new();
        let a = db.add_file("a".to_owned());
        let b = db.add_file("b".to_owned());
        add(&mut db, a, "1.1", 1000, "x", "msg");
        add(&mut db, b, "1.1", 1001, "x", "msg");

        build_changesets(&mut db, 300);

        let commits: Vec<_> = db
            .changesets()
            .filter(|(_, c)| c.kind == ChangesetKind::Commit)
            .collect();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].1.members.len(), 2);
        assert_eq!(commits[0].1.timestamp.seconds(), 1001);
    }

    #[test]
    fn same_file_twice_splits_into_two_changesets() {
        let mut db = Database::new();
        let a = db.add_file("a".to_owned());
        add(&mut db, a, "1.1", 1000, "x", "msg");
        add(&mut db, a, "1.2", 1001, "x", "msg");

        build_changesets(&mut db, 300);

        let commits: Vec<_> = db
            .changesets()
            .filter(|(_, c)| c.kind == ChangesetKind::Commit)
            .collect();
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn gap_beyond_window_splits_cluster() {
        let mut db = Database::new();
        let a = db.add_file("a".to_owned());
        let b = db.add_file("b".to_owned());
        add(&mut db, a, "1.1", 1000, "x", "msg");
        add(&mut db, b, "1.1", 2000, "x", "msg");

        build_changesets(&mut db, 300);

        let commits: Vec<_> = db
            .changesets()
            .filter(|(_, c)| c.kind == ChangesetKind::Commit)
            .collect();
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn every_tag_and_branch_becomes_an_empty_changeset() {
        let mut db = Database::new();
        db.add_tag(crate::tag::Tag::new_tag("T1".to_owned()));
        build_changesets(&mut db, 300);
        let non_commit: Vec<_> = db
            .changesets()
            .filter(|(_, c)| c.kind != ChangesetKind::Commit)
            .collect();
        // trunk branch + T1 tag
        assert_eq!(non_commit.len(), 2);
        assert!(non_commit.iter().all(|(_, c)| c.members.is_empty()));
    }
}
