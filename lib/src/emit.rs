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

//! The Emitter (spec §4.4): turns a scheduled [`crate::changeset::Changeset`]
//! into fast-import records, pulling missing blob content through the
//! [`crate::fetch::Transport`] seam on demand.

use std::io::Write;

use crate::changeset::ChangesetKind;
use crate::config::Settings;
use crate::database::Database;
use crate::error::CoreResult;
use crate::fetch::fetch_versions;
use crate::fetch::Transport;
use crate::fixup::fixup_commit_message;
use crate::fixup::plan_fixups;
use crate::fixup::FixupVersion;
use crate::ids::ChangesetId;
use crate::ids::TagId;
use crate::mark::MarkAllocator;
use crate::summary::RunSummary;
use crate::tag::TagKind;
use crate::time::Timestamp;

fn branch_ref_name(db: &Database, settings: &Settings, branch: crate::ids::TagId) -> String {
    let name = &db.tag(branch).name;
    if name.is_empty() {
        settings.trunk_label.clone()
    } else {
        name.clone()
    }
}

fn write_blob(writer: &mut dyn Write, mark: crate::mark::Mark, content: &[u8]) -> CoreResult<()> {
    write!(writer, "blob\nmark {mark}\ndata {}\n", content.len())?;
    writer.write_all(content)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Fetches every unmarked member of `id`'s Changeset and writes their `blob`
/// records (spec §4.4 steps 1-3).
#[allow(clippy::too_many_arguments)]
fn fetch_and_write_blobs(
    db: &mut Database,
    id: ChangesetId,
    writer: &mut dyn Write,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    settings: &Settings,
    summary: &mut RunSummary,
    length_of: &mut dyn FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<()> {
    let members = db.changeset(id).members.clone();
    let unmarked: Vec<_> = members
        .iter()
        .copied()
        .filter(|&v| db.version(v).mark.is_none())
        .collect();
    if unmarked.is_empty() {
        return Ok(());
    }

    let fetched = fetch_versions(
        db,
        transport,
        marks,
        &unmarked,
        settings.fetch_window_secs,
        length_of,
    )?;
    summary.versions_fetched += fetched.len() as u32;
    for blob in fetched {
        write_blob(writer, blob.mark, &blob.content)?;
        db.version_mut(blob.version).mark = Some(blob.mark);
    }
    Ok(())
}

/// Drains `branch`'s deferred fix-ups (spec §4.5's incremental-application
/// clause): any with `time <= not_after` are emitted now as a synthetic
/// commit, ahead of whatever real commit is about to land; the rest stay
/// pending for the next call (or [`finalize_pending_fixups`] at run's end).
#[allow(clippy::too_many_arguments)]
fn apply_due_fixups(
    db: &mut Database,
    branch: TagId,
    not_after: Timestamp,
    writer: &mut dyn Write,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    settings: &Settings,
    summary: &mut RunSummary,
    length_of: &mut dyn FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<()> {
    let all = std::mem::take(&mut db.tag_mut(branch).pending_fixups);
    if all.is_empty() {
        return Ok(());
    }
    let (due, deferred): (Vec<FixupVersion>, Vec<FixupVersion>) =
        all.into_iter().partition(|f| f.time.map_or(true, |t| t <= not_after));
    db.tag_mut(branch).pending_fixups = deferred;
    if due.is_empty() {
        return Ok(());
    }
    let ref_name = branch_ref_name(db, settings, branch);
    emit_fixup_commit(db, branch, &due, "heads", &ref_name, writer, transport, marks, settings, summary, length_of)
}

/// Writes the fix-up commit itself: fetches any unmarked targets, then one
/// `commit`/`M`/`D` block summarizing `fixups` (spec §4.5). Shared by the
/// immediate-tag path, the incremental branch path, and finalization.
#[allow(clippy::too_many_arguments)]
fn emit_fixup_commit(
    db: &mut Database,
    tag_id: TagId,
    fixups: &[FixupVersion],
    ref_root: &str,
    ref_name: &str,
    writer: &mut dyn Write,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    settings: &Settings,
    summary: &mut RunSummary,
    length_of: &mut dyn FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<()> {
    let message = fixup_commit_message(db, tag_id, fixups);
    let unmarked: Vec<_> = fixups
        .iter()
        .filter_map(|f| f.target)
        .filter(|&v| db.version(v).mark.is_none())
        .collect();
    if !unmarked.is_empty() {
        let fetched = fetch_versions(db, transport, marks, &unmarked, settings.fetch_window_secs, length_of)?;
        summary.versions_fetched += fetched.len() as u32;
        for blob in fetched {
            write_blob(writer, blob.mark, &blob.content)?;
            db.version_mut(blob.version).mark = Some(blob.mark);
        }
    }

    let mark = marks.allocate();
    write!(writer, "commit refs/{ref_root}/{ref_name}\n")?;
    write!(writer, "mark {mark}\n")?;
    write!(writer, "data {}\n{message}\n", message.len())?;
    for fixup in fixups {
        let path = db.file(fixup.file).path.clone();
        match fixup.target {
            Some(v) => {
                let version = db.version(v);
                let blob_mark = version.mark.expect("fix-up target must be fetched by now");
                let mode = if version.executable { "755" } else { "644" };
                write!(writer, "M {mode} {blob_mark} {path}\n")?;
            }
            None => write!(writer, "D {path}\n")?,
        }
    }

    if db.tag(tag_id).kind == TagKind::Branch {
        for fixup in fixups {
            db.tag_mut(tag_id).branch_versions[fixup.file.index()] = fixup.target;
        }
    }
    db.tag_mut(tag_id).fixup = true;
    Ok(())
}

/// Drains every branch's still-pending fix-ups at the end of a run (spec
/// §4.5: whatever an incremental branch never got a chance to apply before
/// its next commit is applied at finalization instead).
pub fn finalize_pending_fixups(
    db: &mut Database,
    writer: &mut dyn Write,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    settings: &Settings,
    summary: &mut RunSummary,
    mut length_of: impl FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<()> {
    let branches: Vec<TagId> = db.branches().map(|(id, _)| id).collect();
    for branch in branches {
        let fixups = std::mem::take(&mut db.tag_mut(branch).pending_fixups);
        if fixups.is_empty() {
            continue;
        }
        let ref_name = branch_ref_name(db, settings, branch);
        emit_fixup_commit(db, branch, &fixups, "heads", &ref_name, writer, transport, marks, settings, summary, &mut length_of)?;
    }
    Ok(())
}

fn is_noop(db: &Database, id: ChangesetId) -> bool {
    let changeset = db.changeset(id);
    let branch = db.tag(changeset.branch);
    changeset.members.iter().all(|&v| {
        let version = db.version(v);
        let live = db.version_live(v);
        branch
            .branch_versions
            .get(version.file.index())
            .copied()
            .flatten()
            == live
    })
}

/// Emits a `commit`-kind changeset (spec §4.4 steps 1-5). `length_of` reads
/// whatever trailer lines follow a response header and returns the
/// announced byte length (the transport/rlog layer's concern, threaded
/// through rather than assumed by this crate).
#[allow(clippy::too_many_arguments)]
pub fn emit_commit(
    db: &mut Database,
    id: ChangesetId,
    writer: &mut dyn Write,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    settings: &Settings,
    summary: &mut RunSummary,
    mut length_of: impl FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<()> {
    let branch = db.changeset(id).branch;
    let timestamp = db.changeset(id).timestamp;
    apply_due_fixups(db, branch, timestamp, writer, transport, marks, settings, summary, &mut length_of)?;

    fetch_and_write_blobs(db, id, writer, transport, marks, settings, summary, &mut length_of)?;

    if is_noop(db, id) {
        let inherited = db.tag(branch).last.and_then(|c| db.changeset(c).mark);
        db.changeset_mut(id).mark = inherited;
        summary.noop_commits_collapsed += 1;
        return Ok(());
    }

    let members = db.changeset(id).members.clone();
    let mark = marks.allocate();
    db.changeset_mut(id).mark = Some(mark);

    let author = members
        .first()
        .map(|&v| db.version(v).author.clone())
        .unwrap_or_default();
    let log = members
        .first()
        .map(|&v| db.version(v).log.clone())
        .unwrap_or_default();

    let ref_name = branch_ref_name(db, settings, branch);
    write!(writer, "commit refs/heads/{ref_name}\n")?;
    write!(writer, "mark {mark}\n")?;
    write!(writer, "committer {author} {author} {} +0000\n", timestamp.seconds())?;
    write!(writer, "data {}\n{log}\n", log.len())?;

    for &v in &members {
        let version = db.version(v);
        let path = db.file(version.file).path.clone();
        match db.version_live(v) {
            Some(live) => {
                let live_version = db.version(live);
                let blob_mark = live_version.mark.expect("live member must be fetched by now");
                let mode = if live_version.executable { "755" } else { "644" };
                write!(writer, "M {mode} {blob_mark} {path}\n")?;
                db.tag_mut(branch).branch_versions[version.file.index()] = Some(live);
            }
            None => {
                write!(writer, "D {path}\n")?;
                db.tag_mut(branch).branch_versions[version.file.index()] = None;
            }
        }
    }

    db.tag_mut(branch).last = Some(id);
    summary.transactions += 1;
    Ok(())
}

/// Emits a `tag`/`branch`-kind changeset: the `reset` record, then any
/// fix-up commit the Fixup Planner finds necessary (spec §4.4 "For each
/// `tag` Changeset", composed with spec §4.5).
#[allow(clippy::too_many_arguments)]
pub fn emit_tag(
    db: &mut Database,
    id: ChangesetId,
    writer: &mut dyn Write,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    settings: &Settings,
    summary: &mut RunSummary,
    mut length_of: impl FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<()> {
    let Some(tag_id) = db.changeset(id).tag else {
        return Ok(());
    };
    let kind = db.tag(tag_id).kind;
    let ref_root = match kind {
        TagKind::Branch => "heads",
        TagKind::Tag => "tags",
    };
    let ref_name = branch_ref_name(db, settings, tag_id);
    write!(writer, "reset refs/{ref_root}/{ref_name}\n")?;

    let parent_mark = db
        .tag(tag_id)
        .parent
        .and_then(|c| db.changeset(c).mark);
    if let Some(parent_mark) = parent_mark {
        write!(writer, "from {parent_mark}\n")?;
    }

    let fixups = plan_fixups(db, tag_id);
    let needed_fixup = !fixups.is_empty();
    match kind {
        TagKind::Tag => summary.record_tag(needed_fixup),
        TagKind::Branch => summary.record_branch(needed_fixup),
    }

    // Tags apply every fixup immediately; branches only apply what's due by
    // the branch's own scheduler time, deferring the rest (spec §4.5).
    let (due, deferred): (Vec<FixupVersion>, Vec<FixupVersion>) = match kind {
        TagKind::Tag => (fixups, Vec::new()),
        TagKind::Branch => {
            let now = db.changeset(id).timestamp;
            fixups.into_iter().partition(|f| f.time.map_or(true, |t| t <= now))
        }
    };

    if !due.is_empty() {
        emit_fixup_commit(
            db, tag_id, &due, ref_root, &ref_name, writer, transport, marks, settings, summary, &mut length_of,
        )?;
    }
    if !deferred.is_empty() {
        db.tag_mut(tag_id).pending_fixups = deferred;
    }

    db.tag_mut(tag_id).is_released = true;
    Ok(())
}
