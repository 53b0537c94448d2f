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

//! Tunables for the history reconstruction engine. Spec §4.1 and §4.6 name
//! concrete defaults ("300 seconds", etc.); this module is the single place
//! those defaults live, overridable from an optional TOML document the way
//! the teacher crate's own config layer is (`toml_edit` + `serde`), just
//! without the teacher's multi-layer stacking since this engine has no
//! per-user/per-repo config hierarchy to merge.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Error loading or parsing a [`Settings`] document.
#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("configuration cannot be parsed as TOML: {0}")]
    Parse(#[from] toml_edit::de::Error),
}

/// Engine tunables. All fields have defaults matching spec.md so that
/// running without a config file reproduces the documented behavior exactly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum gap, in seconds, between same-(branch, author, log) file
    /// revisions before the Changeset Builder splits them into separate
    /// changesets (spec §4.1, default 300).
    pub coalesce_window_secs: i64,

    /// Maximum spread, in seconds, between the earliest and latest version
    /// in a Fetch Optimizer batch before it falls back to per-version fetch
    /// (spec §4.6 strategy 3, default 300).
    pub fetch_window_secs: i64,

    /// Ref label used for the CVS trunk (empty branch name), spec §6.
    pub trunk_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coalesce_window_secs: 300,
            fetch_window_secs: 300,
            trunk_label: "cvs_master".to_owned(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML document, falling back to [`Settings::default`]
    /// for any field the document doesn't set.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsLoadError> {
        Ok(toml_edit::de::from_str(text)?)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "coalesce_window_secs={}, fetch_window_secs={}, trunk_label={:?}",
            self.coalesce_window_secs, self.fetch_window_secs, self.trunk_label
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let settings = Settings::default();
        assert_eq!(settings.coalesce_window_secs, 300);
        assert_eq!(settings.fetch_window_secs, 300);
        assert_eq!(settings.trunk_label, "cvs_master");
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let settings = Settings::from_toml_str("coalesce_window_secs = 120\n").unwrap();
        assert_eq!(settings.coalesce_window_secs, 120);
        assert_eq!(settings.fetch_window_secs, 300);
    }
}
