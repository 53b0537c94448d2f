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

//! The single structured error kind threaded through every core component
//! (Design Note: "channel fatal errors through a single structured error
//! kind so tests can assert the diagnostic category without
//! string-matching"). Every variant corresponds to one of the categories in
//! spec §7; there is no local recovery except the duplicate-blob case, which
//! is handled inline by the caller and never becomes a `CoreError`.

use thiserror::Error;

use crate::ids::FileId;

/// Fatal error raised by any core component. The core never recovers from
/// one of these: propagation policy is "abort the run with a diagnostic."
#[derive(Debug, Error)]
pub enum CoreError {
    /// The remote server returned a line inconsistent with the expected
    /// transport grammar.
    #[error("protocol mismatch: {0}")]
    Protocol(String),

    /// The server delivered content for a file or revision that was never
    /// seen in the parsed log.
    #[error("server sent unknown revision for {path}@{revision}")]
    UnknownRevision { path: String, revision: String },

    /// A revision log entry could not be parsed, or fell outside the
    /// representable timestamp range.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Transport or output I/O failed.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A version claimed by the parsed log was never returned by the server,
    /// even after the Fetch Optimizer's single-version fallback.
    #[error("version {revision} of file {file:?} was never returned by the server")]
    VersionNotDelivered { file: FileId, revision: String },

    /// Internal consistency check failed (e.g. a changeset re-inserted into
    /// the scheduler's ready heap after being emitted).
    #[error("internal inconsistency: {0}")]
    Inconsistent(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_render_distinct_messages() {
        let err = CoreError::Protocol("unexpected ack".to_owned());
        assert!(err.to_string().contains("protocol mismatch"));
    }
}
