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

//! The Fetch Optimizer (spec §4.6): batches outstanding blob retrievals
//! across the [`Transport`] seam, minimizing round-trips.

use std::collections::BTreeSet;

use crate::database::Database;
use crate::error::CoreError;
use crate::error::CoreResult;
use crate::ids::VersionId;
use crate::mark::Mark;
use crate::mark::MarkAllocator;

/// The request/response channel the Fetch Optimizer drives. A concrete
/// implementation lives in the `cli` crate (pserver/ext/fake/local forms);
/// core only depends on this trait, per spec §4.6's "external transport
/// collaborator" framing.
pub trait Transport {
    fn send_directory(&mut self, dir: &str) -> CoreResult<()>;
    fn send_argument(&mut self, arg: &str) -> CoreResult<()>;
    fn send_update(&mut self) -> CoreResult<()>;
    /// `None` signals the end of the response stream for this request.
    fn read_response_line(&mut self) -> CoreResult<Option<String>>;
    fn read_exact(&mut self, n: usize) -> CoreResult<Vec<u8>>;
}

/// One blob pulled back from the transport, matched to the Version it
/// belongs to and assigned a fresh mark.
pub struct FetchedBlob {
    pub version: VersionId,
    pub mark: Mark,
    pub content: Vec<u8>,
}

/// Parses a single `Created <path>\n<revision>\n<entries-line>\n<mode>\nu=L\n<L bytes>`
/// style response record far enough to recover the announced byte length.
/// The exact rlog/`update` grammar is the transport's concern (spec §6); the
/// optimizer only needs to know how many bytes follow the header it just
/// read, which is why this takes the already-parsed length directly.
fn record_blob(
    transport: &mut dyn Transport,
    version: VersionId,
    length: usize,
    marks: &mut MarkAllocator,
) -> CoreResult<FetchedBlob> {
    let content = transport.read_exact(length)?;
    Ok(FetchedBlob {
        version,
        mark: marks.allocate(),
        content,
    })
}

/// Sends the `Directory` declarations (one per distinct directory of the
/// requested paths, deduplicated), the `Argument` list, and the terminating
/// `update`, per spec §4.6's "Before each request" clause.
fn send_request(
    db: &Database,
    transport: &mut dyn Transport,
    versions: &[VersionId],
    extra_args: &[String],
) -> CoreResult<()> {
    let mut directories = BTreeSet::new();
    for &id in versions {
        let path = &db.file(db.version(id).file).path;
        let dir = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        directories.insert(dir.to_owned());
    }
    for dir in &directories {
        transport.send_directory(dir)?;
    }
    for arg in extra_args {
        transport.send_argument(arg)?;
    }
    for &id in versions {
        let path = db.file(db.version(id).file).path.clone();
        transport.send_argument(&path)?;
    }
    transport.send_update()
}

/// Fetches every Version in `wanted`, assigning marks as blobs arrive.
/// Implements the four strategies of spec §4.6 in order, falling back to a
/// single-version request for whatever strategies 2/3 failed to retrieve.
///
/// `length_of` reads whatever trailer lines follow a response header and
/// returns the announced byte length — the rlog/transport layer's concern
/// (spec §6), threaded through rather than assumed by this optimizer.
pub fn fetch_versions(
    db: &Database,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    wanted: &[VersionId],
    fetch_window_secs: i64,
    mut length_of: impl FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
) -> CoreResult<Vec<FetchedBlob>> {
    let mut outstanding: Vec<VersionId> = wanted.to_vec();
    let mut fetched = Vec::new();
    let mut seen = BTreeSet::new();

    if outstanding.len() == 1 {
        fetch_batch(db, transport, marks, &outstanding, &mut length_of, &mut fetched, &mut seen)?;
        outstanding.retain(|id| !seen.contains(id));
    } else if !outstanding.is_empty() {
        let same_revision = outstanding
            .windows(2)
            .all(|w| db.version(w[0]).revision == db.version(w[1]).revision);
        let same_branch = outstanding
            .windows(2)
            .all(|w| db.version(w[0]).branch == db.version(w[1]).branch);
        let (dmin, dmax) = outstanding
            .iter()
            .map(|&id| db.version(id).timestamp.seconds())
            .fold((i64::MAX, i64::MIN), |(lo, hi), t| (lo.min(t), hi.max(t)));

        if same_revision {
            fetch_batch(db, transport, marks, &outstanding, &mut length_of, &mut fetched, &mut seen)?;
            outstanding.retain(|id| !seen.contains(id));
        } else if same_branch && dmax - dmin < fetch_window_secs {
            fetch_batch(db, transport, marks, &outstanding, &mut length_of, &mut fetched, &mut seen)?;
            outstanding.retain(|id| !seen.contains(id));
        }
    }

    // Fallback: whatever is still outstanding is fetched one at a time.
    for &id in &outstanding {
        if seen.contains(&id) {
            continue;
        }
        let single = [id];
        fetch_batch(db, transport, marks, &single, &mut length_of, &mut fetched, &mut seen)?;
        if !seen.contains(&id) {
            return Err(CoreError::VersionNotDelivered {
                file: db.version(id).file,
                revision: db.version(id).revision.clone(),
            });
        }
    }

    Ok(fetched)
}

#[allow(clippy::too_many_arguments)]
fn fetch_batch(
    db: &Database,
    transport: &mut dyn Transport,
    marks: &mut MarkAllocator,
    batch: &[VersionId],
    length_of: &mut impl FnMut(&mut dyn Transport, &str) -> CoreResult<usize>,
    fetched: &mut Vec<FetchedBlob>,
    seen: &mut BTreeSet<VersionId>,
) -> CoreResult<()> {
    send_request(db, transport, batch, &["-kk".to_owned()])?;

    while let Some(line) = transport.read_response_line()? {
        let Some(path) = parse_response_line(&line) else {
            continue;
        };
        let Some(&version) = batch.iter().find(|&&id| db.file(db.version(id).file).path == path) else {
            return Err(CoreError::UnknownRevision {
                path: path.to_owned(),
                revision: "<unrequested>".to_owned(),
            });
        };
        if seen.contains(&version) {
            tracing::warn!(path, "duplicate blob response discarded");
            continue;
        }
        let length = length_of(transport, &line)?;
        let blob = record_blob(transport, version, length, marks)?;
        seen.insert(version);
        fetched.push(blob);
    }
    Ok(())
}

/// Parses a `Created <path>` / `Updated <path>` / `Update-existing <path>`
/// response header, returning the path. The header never carries the
/// dotted revision string (that lives in the entries-line trailer, the
/// transport's concern per spec §6), so matching against the outstanding
/// batch is by path alone.
fn parse_response_line(line: &str) -> Option<&str> {
    line.strip_prefix("Created ")
        .or_else(|| line.strip_prefix("Updated "))
        .or_else(|| line.strip_prefix("Update-existing "))
}
