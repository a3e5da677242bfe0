//! Directory trees: walking, hashing, and snapshotting
//!
//! Every editable root is reduced to a [`snapshot::DirectorySnapshot`] (one digest per
//! entry) and a fingerprint (one digest for the whole tree) so two instants can be compared.

pub mod hasher;
pub mod path;
pub mod snapshot;
pub mod walker;
