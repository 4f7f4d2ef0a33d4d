//! Filesystem Tree
//!
//! Walks a root directory into an ordered, immutable tree of [`node::FsNode`]s
//! and fingerprints the result so rebuilds can be compared cheaply.

pub mod builder;
pub mod hasher;
pub mod node;
pub mod path;
pub mod walker;

pub use builder::{BuiltTree, TreeBuilder};
pub use hasher::TreeFingerprint;
pub use node::FsNode;
