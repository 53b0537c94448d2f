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

//! The history reconstruction engine: turns a parsed per-file CVS revision
//! history into a causally ordered stream of fast-import records.
//!
//! This crate owns the [`database::Database`] and the six components that
//! operate on it (changeset clustering, tag/branch parent assignment,
//! emission scheduling, fix-up planning, fetch batching, and record
//! emission). Everything I/O-shaped — the wire protocol, the rlog grammar,
//! argument parsing — is an external collaborator reached only through the
//! [`fetch::Transport`] trait; this crate never opens a socket itself.

pub mod analyzer;
pub mod changeset;
pub mod config;
pub mod database;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod fixup;
pub mod ids;
pub mod mark;
pub mod scheduler;
pub mod summary;
pub mod tag;
pub mod time;
