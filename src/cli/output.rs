//! CLI output: rendering of trees, events, and errors.

use crate::error::{ApiError, WalkError};
use crate::service::TreeEvent;
use crate::tree::node::FsNode;

/// Map an error to the message shown to the user.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Walk(WalkError::RootNotFound(path)) => {
            format!("Directory not found: {}", path.display())
        }
        other => other.to_string(),
    }
}

pub fn format_tree(tree: &FsNode, compact: bool) -> Result<String, ApiError> {
    let text = if compact {
        serde_json::to_string(tree)?
    } else {
        serde_json::to_string_pretty(tree)?
    };
    Ok(text)
}

/// One JSON line per event.
pub fn format_event_line(event: &TreeEvent) -> Result<String, ApiError> {
    Ok(serde_json::to_string(event)?)
}
