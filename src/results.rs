use std::time::Duration;

use serde_json::Value;

use crate::error::{ErrorKind, ErrorRecord};
use crate::node::Node;

/// The output of a completed walk.
#[derive(Debug)]
pub struct Tree {
    /// The root node with its full subtree.
    ///
    /// `None` only when listing the root directory itself failed under
    /// [`ErrorPolicy::Ignore`](crate::ErrorPolicy::Ignore) or
    /// [`ErrorPolicy::Record`](crate::ErrorPolicy::Record). The on-complete
    /// hook does not run in that case.
    pub root: Option<Node>,

    /// Errors suppressed under [`ErrorPolicy::Record`](crate::ErrorPolicy::Record),
    /// in the order they occurred.
    pub errors: Vec<ErrorRecord>,

    /// Walk statistics.
    pub stats: WalkStats,
}

impl Tree {
    /// Recorded errors of one kind.
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Serialize the tree to JSON. `Value::Null` when there is no root.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match &self.root {
            Some(root) => serde_json::to_value(root),
            None       => Ok(Value::Null),
        }
    }
}

/// Statistics for a completed walk.
#[derive(Debug, Clone, Default)]
pub struct WalkStats {
    /// Non-directory entries read into the tree.
    pub files: usize,

    /// Directories listed successfully.
    pub dirs: usize,

    /// Entries the skip predicate rejected.
    pub skipped: usize,

    /// Wall-clock time from walk start to completion.
    pub duration: Duration,
}
