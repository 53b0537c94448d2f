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

//! `crap-clone <root> <module>`: drives the whole pipeline — fetch the rlog,
//! build the in-memory database, reconstruct history, and stream fast-import
//! records to stdout (SPEC_FULL.md §6).

mod intern;
mod rlog;
mod transport;

use std::io::Write as _;
use std::process::Command;
use std::process::ExitCode;

use clap::Parser;
use crap_clone_core::analyzer::analyze;
use crap_clone_core::changeset::build_changesets;
use crap_clone_core::changeset::ChangesetKind;
use crap_clone_core::config::Settings;
use crap_clone_core::database::Database;
use crap_clone_core::emit;
use crap_clone_core::error::CoreError;
use crap_clone_core::mark::MarkAllocator;
use crap_clone_core::scheduler::schedule;
use crap_clone_core::summary::RunSummary;
use crap_clone_core::tag::Tag;
use crap_clone_core::tag::TagFile;

/// Converts a CVS repository into a git fast-import stream.
#[derive(Parser, Debug)]
#[command(name = "crap-clone", version, about)]
struct Cli {
    /// Compression level passed to the transport (0 disables).
    #[arg(short = 'z', value_parser = clap::value_parser!(u8).range(0..=9), default_value_t = 0)]
    compression: u8,

    /// CVSROOT string, e.g. `:pserver:user@host/path`.
    root: String,

    /// Module (top-level directory) to convert.
    module: String,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Shells out to `cvs -d <root> rlog -N <module>` to obtain the revision
/// history text. The wire protocol is an external collaborator per spec.md's
/// own scoping; this is the simplest faithful way to obtain it without
/// reimplementing the CVS client/server handshake for the listing step
/// (distinct from the `update` flow the Fetch Optimizer drives over
/// [`crap_clone_core::fetch::Transport`]).
fn fetch_rlog_text(root: &str, module: &str) -> Result<String, CoreError> {
    let output = Command::new("cvs")
        .args(["-d", root, "rlog", "-N", module])
        .output()?;
    if !output.status.success() {
        return Err(CoreError::Protocol(format!(
            "cvs rlog exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Populates `db` from the parsed rlog files. Branch resolution for
/// vendor/feature branches is out of scope for this CLI glue (the hard
/// branch-parent-assignment problem lives entirely in
/// [`crap_clone_core::analyzer`], already fully exercised by its own tests);
/// every revision here lands on the trunk, and symbolic names become
/// tag-kind [`Tag`]s pinned to the revision they name.
fn populate_database(db: &mut Database, files: Vec<rlog::FileLog>, interner: &mut intern::Interner) {
    let trunk = db.trunk();
    let mut pending_tags: Vec<(String, String, crap_clone_core::ids::FileId)> = Vec::new();

    for file_log in files {
        let file_id = db.add_file(file_log.path.clone());
        let mut revisions = file_log.revisions;
        revisions.sort_by_key(|r| r.timestamp_secs);

        let mut parent = None;
        let mut by_revision = std::collections::HashMap::new();
        for record in &revisions {
            let author = interner.intern(&record.author);
            let log = interner.intern(&record.log);
            match db.add_version(
                file_id,
                record.revision.clone(),
                record.timestamp_secs,
                author.to_string(),
                log.to_string(),
                record.dead,
                false,
                parent,
                trunk,
            ) {
                Ok(id) => {
                    by_revision.insert(record.revision.clone(), id);
                    parent = Some(id);
                }
                Err(err) => {
                    tracing::warn!(file = %file_log.path, revision = %record.revision, %err, "dropping unparseable version");
                }
            }
        }

        for (name, revision) in file_log.symbols {
            if by_revision.contains_key(&revision) {
                pending_tags.push((name, revision, file_id));
            }
        }
    }

    let mut tags_by_name: std::collections::HashMap<String, crap_clone_core::ids::TagId> =
        std::collections::HashMap::new();
    for (name, revision, file_id) in pending_tags {
        let tag_id = *tags_by_name
            .entry(name.clone())
            .or_insert_with(|| db.add_tag(Tag::new_tag(name)));
        let version = db
            .file(file_id)
            .versions
            .iter()
            .copied()
            .find(|&v| db.version(v).revision == revision);
        if let Some(version) = version {
            db.tag_mut(tag_id).tag_files.push(TagFile { file: file_id, version });
        }
    }
}

/// Reads the trailer CVS sends after a `Created`/`Updated`/`Update-existing`
/// line — an entries-line, a mode line, then `u=<length>` — and returns the
/// announced byte count. This is the one place the CLI touches the `update`
/// response grammar the core Fetch Optimizer deliberately stays ignorant of.
fn response_trailer_length(
    transport: &mut dyn crap_clone_core::fetch::Transport,
    _header_line: &str,
) -> Result<usize, CoreError> {
    let _entries_line = transport.read_response_line()?;
    let mode_line = transport.read_response_line()?;
    let mode_line = mode_line.ok_or_else(|| CoreError::Protocol("truncated response trailer".to_owned()))?;
    let length = mode_line
        .strip_prefix("u=")
        .and_then(|n| n.parse::<usize>().ok())
        .ok_or_else(|| CoreError::Protocol(format!("expected u=<length>, got {mode_line:?}")))?;
    Ok(length)
}

fn progress_line(db: &Database, id: crap_clone_core::ids::ChangesetId) -> Option<String> {
    let changeset = db.changeset(id);
    if changeset.kind != ChangesetKind::Commit {
        return None;
    }
    Some(format!("{} COMMIT", changeset.timestamp.format_progress_line()))
}

fn run(cli: &Cli) -> Result<(), CoreError> {
    let settings = Settings::default();
    let cvs_rsh = std::env::var("CVS_RSH").unwrap_or_else(|_| "ssh".to_owned());
    let root = transport::Root::parse(&cli.root)?;

    let rlog_text = fetch_rlog_text(&cli.root, &cli.module)?;
    let files = rlog::parse_rlog(&rlog_text)?;

    let mut db = Database::new();
    let mut interner = intern::Interner::new();
    populate_database(&mut db, files, &mut interner);

    build_changesets(&mut db, settings.coalesce_window_secs);
    analyze(&mut db);

    let mut transport = transport::connect(&root, &cvs_rsh, cli.compression)?;
    let mut marks = MarkAllocator::new();
    let mut summary = RunSummary::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let stderr = std::io::stderr();
    let mut err = stderr.lock();

    schedule(&mut db, |db, id| {
        if let Some(line) = progress_line(db, id) {
            let _ = writeln!(err, "{line}");
        }
        match db.changeset(id).kind {
            ChangesetKind::Commit => emit::emit_commit(
                db,
                id,
                &mut out,
                transport.as_mut(),
                &mut marks,
                &settings,
                &mut summary,
                response_trailer_length,
            ),
            ChangesetKind::Tag | ChangesetKind::Branch => emit::emit_tag(
                db,
                id,
                &mut out,
                transport.as_mut(),
                &mut marks,
                &settings,
                &mut summary,
                response_trailer_length,
            ),
        }
    })?;

    emit::finalize_pending_fixups(
        &mut db,
        &mut out,
        transport.as_mut(),
        &mut marks,
        &settings,
        &mut summary,
        response_trailer_length,
    )?;

    writeln!(out, "progress done")?;
    writeln!(err, "{summary}")?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("crap-clone: {err}");
            ExitCode::FAILURE
        }
    }
}
