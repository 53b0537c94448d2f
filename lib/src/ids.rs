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

//! Arena-index newtypes used to cross-reference [`crate::database::Database`]
//! entities without raw pointers or `Rc`/`RefCell` cycles.

/// Declares a `Copy` newtype wrapping a `u32` arena offset, along with the
/// small set of conversions every arena handle needs.
macro_rules! arena_id {
    ($(#[$attr:meta])* $vis:vis $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(u32);

        impl $name {
            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).expect("arena index overflowed u32"))
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies a [`crate::database::File`] by its position in the
    /// `Database`'s file arena.
    pub FileId
);
arena_id!(
    /// Identifies a [`crate::database::Version`] by its position in the
    /// `Database`'s version arena.
    pub VersionId
);
arena_id!(
    /// Identifies a [`crate::tag::Tag`] by its position in the `Database`'s
    /// tag arena.
    pub TagId
);
arena_id!(
    /// Identifies a [`crate::changeset::Changeset`] by its position in the
    /// `Database`'s changeset arena.
    pub ChangesetId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_index() {
        let id = FileId::from_index(7);
        assert_eq!(id.index(), 7);
        assert_eq!(format!("{id:?}"), "FileId(7)");
    }
}
