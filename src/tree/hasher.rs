//! Structural fingerprints for built trees using BLAKE3

use crate::tree::node::FsNode;
use blake3::Hasher;
use serde::{Serialize, Serializer};
use std::fmt;

/// BLAKE3 digest of a tree's shape
///
/// Covers every node's kind, path and position; file contents are not read.
/// Two builds of an unchanged directory produce the same fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeFingerprint(pub [u8; 32]);

impl TreeFingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for TreeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeFingerprint({})", &self.to_hex()[..16])
    }
}

/// Serialized as lowercase hex.
impl Serialize for TreeFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for TreeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the fingerprint of a tree
///
/// Per node, in pre-order: kind tag || path_len || path || child_count.
pub fn fingerprint(root: &FsNode) -> TreeFingerprint {
    let mut hasher = Hasher::new();
    for node in root.iter() {
        hash_node(&mut hasher, node);
    }
    TreeFingerprint(*hasher.finalize().as_bytes())
}

fn hash_node(hasher: &mut Hasher, node: &FsNode) {
    let path_string = node.path.to_string_lossy();
    let path_bytes = path_string.as_bytes();

    // Hash type discriminator
    hasher.update(if node.is_dir { b"d" } else { b"f" });

    // Hash path length (8 bytes, big-endian for determinism)
    hasher.update(&(path_bytes.len() as u64).to_be_bytes());
    hasher.update(path_bytes);

    // Child count keeps sibling boundaries unambiguous in the pre-order stream
    hasher.update(&(node.children().len() as u64).to_be_bytes());
}
