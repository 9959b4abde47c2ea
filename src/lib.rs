//! # dirtree
//!
//! Asynchronous, error-resilient directory tree walker with per-node hooks.
//!
//! dirtree reads a filesystem subtree into an in-memory tree of [`Node`]s.
//! It owns the traversal, the hook contracts ([`SkipFilter`], [`ReadHook`],
//! [`ChildrenHook`], [`CompleteHook`]), the error policy and the builder API.
//! What a node contains, which entries are kept and how siblings are ordered
//! belong to the caller.
//!
//! Listing and stat failures do not abort the walk unless asked to: each is
//! dropped, recorded into [`Tree::errors`], or thrown, per [`ErrorPolicy`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dirtree::{Entry, ErrorPolicy, Node};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), dirtree::DirTreeError> {
//! let tree = dirtree::walk("docs")
//!     .stat_errors(ErrorPolicy::Record)
//!     .skip_matching("node_modules")
//!     .on_read(|entry: &Entry<'_>| json!({ "text": entry.name }))
//!     .on_children(|_dir: &Entry<'_>, _node: &Node, children: &mut Vec<Node>| {
//!         children.sort_by(|a, b| a.name().cmp(b.name()));
//!     })
//!     .run()
//!     .await?;
//!
//! if let Some(root) = &tree.root {
//!     for node in root.iter() {
//!         println!("{}{}", "  ".repeat(node.depth()), node.name());
//!     }
//! }
//! for error in &tree.errors {
//!     eprintln!("skipped: {error}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Ordering
//!
//! The stats for a directory's entries are issued together and children are
//! collected in the order they settle. Sort in an on-children hook when the
//! output order matters.

#![forbid(unsafe_code)]

mod builder;
mod config;
mod engine;
mod entry;
mod error;
mod node;
mod results;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::TreeBuilder;
pub use config::{WalkConfig, DEFAULT_CHILD_KEY};
pub use entry::{Entry, EntryKind, Stat};
pub use error::{DirTreeError, ErrorKind, ErrorPolicy, ErrorRecord};
pub use node::{
    Ancestors, BreadthFirst, FileInfo, Iter, NearestFirst, Node, ReadOutcome, FILE_INFO_FIELD, SCALAR_FIELD,
};
pub use results::{Tree, WalkStats};
pub use traits::{ChildrenHook, CompleteHook, FileSystem, ReadHook, SkipFilter, TokioFs};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`TreeBuilder`] for the tree rooted at `root`.
///
/// Relative roots are resolved against the current directory when the walk
/// runs. Node paths are always absolute.
pub fn walk(root: impl Into<std::path::PathBuf>) -> TreeBuilder {
    TreeBuilder::new(root.into())
}
