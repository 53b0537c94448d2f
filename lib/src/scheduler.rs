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

//! The Emission Scheduler (spec §4.3): a min-heap keyed on
//! `(timestamp, kind-priority, stable-id)` that drives changesets out in a
//! linear extension of the parent→child DAG the Analyzer built.
//!
//! Grounded on the same heap-driven clustering shape as the retrieved
//! `sourcegraph/git-cvs-fast-import` `patchset` crate's `Detector`, which
//! faces an identical "pop the earliest ready thing" problem, generalized
//! here with an explicit kind-priority and a stable tie-breaker per spec
//! §4.3 ("tags sort before commits at equal timestamp").

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::changeset::ChangesetKind;
use crate::database::Database;
use crate::error::CoreError;
use crate::error::CoreResult;
use crate::ids::ChangesetId;
use crate::time::Timestamp;

fn kind_priority(kind: ChangesetKind) -> u8 {
    match kind {
        ChangesetKind::Tag | ChangesetKind::Branch => 0,
        ChangesetKind::Commit => 1,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ReadyKey {
    timestamp: Timestamp,
    kind_priority: u8,
    stable_id: u32,
}

/// Builds the initial ready set (every changeset whose `unready_count` is
/// already zero) and drains it in heap order, invoking `on_emit` for each
/// changeset as it becomes ready. `on_emit` receives `&mut Database` so it
/// can update branch-versions, marks, and the per-branch `last` pointer
/// before the loop continues (spec §4.3 "Invariants").
pub fn schedule(
    db: &mut Database,
    mut on_emit: impl FnMut(&mut Database, ChangesetId) -> CoreResult<()>,
) -> CoreResult<()> {
    let mut heap: BinaryHeap<Reverse<(ReadyKey, ChangesetId)>> = BinaryHeap::new();
    let mut emitted = vec![false; db.changeset_count()];

    let ids: Vec<ChangesetId> = db.changesets().map(|(id, _)| id).collect();
    for id in &ids {
        if db.changeset(*id).unready_count == 0 {
            push_ready(db, &mut heap, *id);
        }
    }

    while let Some(Reverse((_, id))) = heap.pop() {
        if emitted[id.index()] {
            return Err(CoreError::Inconsistent(format!(
                "changeset {id:?} was re-inserted into the ready heap after being emitted"
            )));
        }
        emitted[id.index()] = true;

        on_emit(db, id)?;

        let children = db.changeset(id).children.clone();
        for child in children {
            let unready = &mut db.changeset_mut(child).unready_count;
            *unready = unready.saturating_sub(1);
            if db.changeset(child).unready_count == 0 {
                push_ready(db, &mut heap, child);
            }
        }
    }

    let unemitted: Vec<_> = ids.iter().filter(|id| !emitted[id.index()]).collect();
    if !unemitted.is_empty() {
        return Err(CoreError::Inconsistent(format!(
            "{} changeset(s) never became ready: the parent\u{2192}child DAG has a cycle or a \
             dangling dependency ({unemitted:?})",
            unemitted.len()
        )));
    }

    Ok(())
}

fn push_ready(
    db: &Database,
    heap: &mut BinaryHeap<Reverse<(ReadyKey, ChangesetId)>>,
    id: ChangesetId,
) {
    let changeset = db.changeset(id);
    let key = ReadyKey {
        timestamp: changeset.timestamp,
        kind_priority: kind_priority(changeset.kind),
        stable_id: id.index() as u32,
    };
    heap.push(Reverse((key, id)));
}
