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

//! A line-oriented parser for the `rlog`/`log -N` response grammar
//! (SPEC_FULL.md §6 "rlog parser"): revision headers, `date:`/`author:`/
//! `state:` lines, and log message bodies separated by the `----`/`====`
//! record delimiters.

use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;

use crap_clone_core::error::CoreError;
use crap_clone_core::error::CoreResult;

const REVISION_SEPARATOR: &str = "----------------------------";
const FILE_SEPARATOR: &str =
    "=============================================================================";

#[derive(Debug, Clone)]
pub struct RevisionRecord {
    pub revision: String,
    pub timestamp_secs: i64,
    pub author: String,
    pub dead: bool,
    pub log: String,
}

#[derive(Debug, Clone, Default)]
pub struct FileLog {
    pub path: String,
    /// Symbolic name -> pinned revision, as declared in the `symbolic
    /// names:` section (tags and branch points alike).
    pub symbols: Vec<(String, String)>,
    pub revisions: Vec<RevisionRecord>,
}

fn parse_date(text: &str) -> CoreResult<i64> {
    // CVS emits either `YYYY/MM/DD HH:MM:SS` or, for years >= 2000 on newer
    // servers, `YYYY-MM-DD HH:MM:SS`; both are UTC.
    let normalized = text.replacen('/', "-", 2);
    let naive = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| CoreError::Malformed(format!("unparseable date {text:?}: {e}")))?;
    Ok(Utc.from_utc_datetime(&naive).timestamp())
}

/// Parses one `date: ...;  author: ...;  state: ...;` header line.
fn parse_revision_header(line: &str) -> CoreResult<(i64, String, bool)> {
    let mut date = None;
    let mut author = None;
    let mut dead = false;
    for field in line.split(';') {
        let field = field.trim();
        if let Some(value) = field.strip_prefix("date:") {
            date = Some(parse_date(value.trim())?);
        } else if let Some(value) = field.strip_prefix("author:") {
            author = Some(value.trim().to_owned());
        } else if let Some(value) = field.strip_prefix("state:") {
            dead = value.trim() == "dead";
        }
    }
    let date = date.ok_or_else(|| CoreError::Malformed(format!("missing date: in {line:?}")))?;
    let author = author.ok_or_else(|| CoreError::Malformed(format!("missing author: in {line:?}")))?;
    Ok((date, author, dead))
}

/// Parses a full `rlog` response body into one [`FileLog`] per `Working
/// file:` block.
pub fn parse_rlog(text: &str) -> CoreResult<Vec<FileLog>> {
    let mut files = Vec::new();
    let mut current: Option<FileLog> = None;
    let mut in_symbols = false;
    let mut pending_header: Option<(i64, String, bool)> = None;
    let mut log_lines: Vec<&str> = Vec::new();

    let flush_revision = |current: &mut Option<FileLog>,
                          pending_header: &mut Option<(i64, String, bool)>,
                          log_lines: &mut Vec<&str>,
                          revision: &str| {
        if let (Some(file), Some((timestamp_secs, author, dead))) =
            (current.as_mut(), pending_header.take())
        {
            file.revisions.push(RevisionRecord {
                revision: revision.to_owned(),
                timestamp_secs,
                author,
                dead,
                log: log_lines.join("\n"),
            });
        }
        log_lines.clear();
    };

    let mut pending_revision = String::new();

    for line in text.lines() {
        if line == FILE_SEPARATOR {
            if !pending_revision.is_empty() {
                flush_revision(&mut current, &mut pending_header, &mut log_lines, &pending_revision);
                pending_revision.clear();
            }
            if let Some(file) = current.take() {
                files.push(file);
            }
            in_symbols = false;
            continue;
        }
        if line == REVISION_SEPARATOR {
            if !pending_revision.is_empty() {
                flush_revision(&mut current, &mut pending_header, &mut log_lines, &pending_revision);
                pending_revision.clear();
            }
            continue;
        }
        if let Some(path) = line.strip_prefix("Working file: ") {
            current = Some(FileLog {
                path: path.to_owned(),
                ..Default::default()
            });
            in_symbols = false;
            continue;
        }
        if line == "symbolic names:" {
            in_symbols = true;
            continue;
        }
        if in_symbols {
            if let Some((name, revision)) = line.trim().split_once(": ") {
                if let Some(file) = current.as_mut() {
                    file.symbols.push((name.to_owned(), revision.to_owned()));
                }
                continue;
            }
            in_symbols = false;
        }
        if let Some(revision) = line.strip_prefix("revision ") {
            pending_revision = revision.trim().to_owned();
            continue;
        }
        if line.starts_with("date:") {
            pending_header = Some(parse_revision_header(line)?);
            continue;
        }
        if !pending_revision.is_empty() && pending_header.is_some() {
            log_lines.push(line);
        }
    }
    if !pending_revision.is_empty() {
        flush_revision(&mut current, &mut pending_header, &mut log_lines, &pending_revision);
    }
    if let Some(file) = current.take() {
        files.push(file);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "RCS file: /cvsroot/module/a.txt,v\n\
Working file: a.txt\n\
head: 1.2\n\
branch:\n\
symbolic names:\n\
\tREL-1: 1.1\n\
keyword substitution: kv\n\
total revisions: 2;\tselected revisions: 2\n\
description:\n\
----------------------------\n\
revision 1.2\n\
date: 2024-01-02 03:04:05;  author: alice;  state: Exp;  lines: +1 -0;\n\
second revision\n\
----------------------------\n\
revision 1.1\n\
date: 2024-01-01 00:00:00;  author: alice;  state: Exp;\n\
initial revision\n\
=============================================================================\n";

    #[test]
    fn parses_one_file_with_two_revisions_and_a_symbol() {
        let files = parse_rlog(SAMPLE).unwrap();
        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert_eq!(file.path, "a.txt");
        assert_eq!(file.symbols, vec![("REL-1".to_owned(), "1.1".to_owned())]);
        assert_eq!(file.revisions.len(), 2);
        assert_eq!(file.revisions[0].revision, "1.2");
        assert_eq!(file.revisions[0].log, "second revision");
        assert!(!file.revisions[0].dead);
    }

    #[test]
    fn dead_state_is_recognised() {
        let text = SAMPLE.replace("state: Exp;  lines: +1 -0;", "state: dead;");
        let files = parse_rlog(&text).unwrap();
        assert!(files[0].revisions[0].dead);
    }
}
