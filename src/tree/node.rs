//! Tree node model handed to the presentation layer

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One filesystem entry
///
/// Serialized as `{"Path", "Name", "IsDir", "Children"}`. `children` is `Some`
/// exactly when `is_dir` is true, so files serialize without a `Children` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FsNode {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FsNode>>,
}

impl FsNode {
    pub fn file(path: PathBuf) -> Self {
        let name = display_name(&path);
        Self {
            path,
            name,
            is_dir: false,
            children: None,
        }
    }

    pub fn directory(path: PathBuf, children: Vec<FsNode>) -> Self {
        let name = display_name(&path);
        Self {
            path,
            name,
            is_dir: true,
            children: Some(children),
        }
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[FsNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Look up a direct child by display name.
    pub fn child(&self, name: &str) -> Option<&FsNode> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Find a node anywhere in this subtree by path.
    pub fn find(&self, path: &Path) -> Option<&FsNode> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children().iter().find_map(|c| c.find(path))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(FsNode::node_count).sum::<usize>()
    }

    /// Pre-order traversal.
    pub fn iter(&self) -> impl Iterator<Item = &FsNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }
}

/// Sibling order: directories first, then name ascending.
pub fn sibling_order(a: &FsNode, b: &FsNode) -> Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
