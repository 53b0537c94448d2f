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

//! End-to-end pipeline tests: `build_changesets` -> `analyze` -> `schedule`
//! -> `emit_commit`/`emit_tag`, covering the scenarios named in
//! SPEC_FULL.md §8. Every version is pre-marked so these tests never need a
//! real [`Transport`] round-trip; [`NullTransport`] only exists to satisfy
//! the emitter's signature.

use crap_clone_core::analyzer::analyze;
use crap_clone_core::changeset::build_changesets;
use crap_clone_core::changeset::ChangesetKind;
use crap_clone_core::config::Settings;
use crap_clone_core::database::Database;
use crap_clone_core::emit::emit_commit;
use crap_clone_core::emit::emit_tag;
use crap_clone_core::emit::finalize_pending_fixups;
use crap_clone_core::error::CoreResult;
use crap_clone_core::fetch::Transport;
use crap_clone_core::ids::FileId;
use crap_clone_core::mark::MarkAllocator;
use crap_clone_core::scheduler::schedule;
use crap_clone_core::summary::RunSummary;
use crap_clone_core::tag::Tag;
use crap_clone_core::tag::TagFile;
use pretty_assertions::assert_eq;

struct NullTransport;

impl Transport for NullTransport {
    fn send_directory(&mut self, _dir: &str) -> CoreResult<()> {
        Ok(())
    }
    fn send_argument(&mut self, _arg: &str) -> CoreResult<()> {
        Ok(())
    }
    fn send_update(&mut self) -> CoreResult<()> {
        Ok(())
    }
    fn read_response_line(&mut self) -> CoreResult<Option<String>> {
        Ok(None)
    }
    fn read_exact(&mut self, _n: usize) -> CoreResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

#[allow(clippy::too_many_arguments)]
fn add_version(
    db: &mut Database,
    marks: &mut MarkAllocator,
    file: FileId,
    rev: &str,
    t: i64,
    author: &str,
    log: &str,
    dead: bool,
) -> crap_clone_core::ids::VersionId {
    let trunk = db.trunk();
    let v = db
        .add_version(
            file,
            rev.to_owned(),
            t,
            author.to_owned(),
            log.to_owned(),
            dead,
            false,
            None,
            trunk,
        )
        .unwrap();
    db.version_mut(v).mark = Some(marks.allocate());
    v
}

fn run_pipeline(db: &mut Database) -> (Vec<u8>, RunSummary) {
    build_changesets(db, 300);
    analyze(db);

    let mut out = Vec::new();
    let mut transport = NullTransport;
    let mut marks = MarkAllocator::new();
    let settings = Settings::default();
    let mut summary = RunSummary::default();

    schedule(db, |db, id| match db.changeset(id).kind {
        ChangesetKind::Commit => {
            emit_commit(db, id, &mut out, &mut transport, &mut marks, &settings, &mut summary, |_, _| Ok(0))
        }
        ChangesetKind::Tag | ChangesetKind::Branch => {
            emit_tag(db, id, &mut out, &mut transport, &mut marks, &settings, &mut summary, |_, _| Ok(0))
        }
    })
    .unwrap();

    finalize_pending_fixups(db, &mut out, &mut transport, &mut marks, &settings, &mut summary, |_, _| Ok(0)).unwrap();

    (out, summary)
}

#[test]
fn single_file_two_commits_no_tags() {
    let mut db = Database::new();
    let mut marks = MarkAllocator::new();
    let a = db.add_file("a.txt".to_owned());
    add_version(&mut db, &mut marks, a, "1.1", 100, "alice", "init", false);
    add_version(&mut db, &mut marks, a, "1.2", 200, "alice", "update", false);

    let (out, summary) = run_pipeline(&mut db);
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.matches("commit refs/heads/cvs_master\n").count(), 2);
    assert_eq!(summary.transactions, 2);
    assert_eq!(summary.noop_commits_collapsed, 0);
}

#[test]
fn two_files_committed_together_become_one_changeset() {
    let mut db = Database::new();
    let mut marks = MarkAllocator::new();
    let a = db.add_file("a.txt".to_owned());
    let b = db.add_file("b.txt".to_owned());
    add_version(&mut db, &mut marks, a, "1.1", 100, "alice", "shared commit", false);
    add_version(&mut db, &mut marks, b, "1.1", 100, "alice", "shared commit", false);

    let (out, summary) = run_pipeline(&mut db);
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.matches("commit refs/heads/cvs_master\n").count(), 1);
    assert_eq!(text.matches("M 644").count(), 2);
    assert_eq!(summary.transactions, 1);
}

#[test]
fn tag_aliasing_a_real_commit_needs_no_fixup() {
    let mut db = Database::new();
    let mut marks = MarkAllocator::new();
    let a = db.add_file("a.txt".to_owned());
    let v1 = add_version(&mut db, &mut marks, a, "1.1", 100, "alice", "init", false);
    let _v2 = add_version(&mut db, &mut marks, a, "1.2", 200, "alice", "update", false);

    let tag_id = db.add_tag(Tag::new_tag("REL-1".to_owned()));
    db.tag_mut(tag_id).tag_files.push(TagFile { file: a, version: v1 });

    let (out, summary) = run_pipeline(&mut db);
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("reset refs/tags/REL-1\n"));
    assert_eq!(summary.exact_tags, 1);
    assert_eq!(summary.fixup_tags, 0);
    assert!(!text.contains("Fix-up commit"));
}

#[test]
fn tag_pinning_an_impossible_combination_needs_a_fixup() {
    let mut db = Database::new();
    let mut marks = MarkAllocator::new();
    let a = db.add_file("a.txt".to_owned());
    let b = db.add_file("b.txt".to_owned());
    // a and b are always committed together, at t=100 and t=200.
    let v1a = add_version(&mut db, &mut marks, a, "1.1", 100, "alice", "shared", false);
    let _v1b = add_version(&mut db, &mut marks, b, "1.1", 100, "alice", "shared", false);
    let _v2a = add_version(&mut db, &mut marks, a, "1.2", 200, "alice", "shared again", false);
    let v2b = add_version(&mut db, &mut marks, b, "1.2", 200, "alice", "shared again", false);

    // The tag pins old `a` with new `b` -- no single commit snapshot produced
    // this combination, so a fix-up is required.
    let tag_id = db.add_tag(Tag::new_tag("REL-1".to_owned()));
    db.tag_mut(tag_id).tag_files.push(TagFile { file: a, version: v1a });
    db.tag_mut(tag_id).tag_files.push(TagFile { file: b, version: v2b });

    let (out, summary) = run_pipeline(&mut db);
    let text = String::from_utf8(out).unwrap();

    assert_eq!(summary.fixup_tags, 1);
    assert_eq!(summary.exact_tags, 0);
    assert!(text.contains("Fix-up commit generated by crap-clone."));
}

#[test]
fn dead_revision_pinned_by_a_tag_emits_a_delete() {
    let mut db = Database::new();
    let mut marks = MarkAllocator::new();
    let a = db.add_file("a.txt".to_owned());
    let v1 = add_version(&mut db, &mut marks, a, "1.1", 100, "alice", "init", false);
    let v2 = add_version(&mut db, &mut marks, a, "1.2", 200, "alice", "remove", true);
    db.version_mut(v2).parent = Some(v1);

    let tag_id = db.add_tag(Tag::new_tag("REL-1".to_owned()));
    db.tag_mut(tag_id).tag_files.push(TagFile { file: a, version: v2 });

    let (out, summary) = run_pipeline(&mut db);
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("reset refs/tags/REL-1\n"));
    assert_eq!(summary.exact_tags, 1);
}

#[test]
fn vendor_import_normalising_onto_the_current_tip_collapses_to_a_noop() {
    let mut db = Database::new();
    let mut marks = MarkAllocator::new();
    let a = db.add_file("a.txt".to_owned());
    let v1 = add_version(&mut db, &mut marks, a, "1.1", 100, "alice", "init", false);
    let v2 = add_version(&mut db, &mut marks, a, "1.1.1.1", 200, "vendor", "import", false);
    db.version_mut(v2).implicit_merge = Some(v1);

    let (out, summary) = run_pipeline(&mut db);
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.matches("commit refs/heads/cvs_master\n").count(), 1);
    assert_eq!(summary.noop_commits_collapsed, 1);
    assert_eq!(summary.transactions, 1);
}
