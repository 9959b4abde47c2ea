use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::entry::{Entry, Stat};
use crate::error::ErrorRecord;
use crate::node::{Node, ReadOutcome};

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Decides whether an entry is left out of the tree.
///
/// Called once per child entry after its metadata is known. A skipped entry
/// never reaches on-read, and a skipped directory is never listed, so none
/// of its descendants are visited.
///
/// Closures of the form `Fn(&Entry<'_>) -> bool` implement this trait.
///
/// # Thread Safety
///
/// `Send + Sync` are required so the walk future stays `Send` and can be
/// spawned onto a multi-threaded runtime.
///
/// # Example
///
/// ```rust
/// use dirtree::{Entry, SkipFilter};
///
/// struct Hidden;
///
/// impl SkipFilter for Hidden {
///     fn is_skip(&self, entry: &Entry<'_>) -> bool {
///         entry.name.starts_with('.')
///     }
/// }
/// ```
pub trait SkipFilter: Send + Sync {
    /// Returns `true` if this entry should be skipped.
    fn is_skip(&self, entry: &Entry<'_>) -> bool;
}

impl<F> SkipFilter for F
where
    F: Fn(&Entry<'_>) -> bool + Send + Sync,
{
    fn is_skip(&self, entry: &Entry<'_>) -> bool {
        self(entry)
    }
}

/// Produces the hook-defined part of a node.
///
/// Called once for every file and directory that makes it into the tree.
/// Directories are read after their listing succeeded, so
/// [`Entry::child_files`] is always `Some` for them.
pub trait ReadHook: Send + Sync {
    fn on_read(&self, entry: &Entry<'_>) -> ReadOutcome;
}

impl<F> ReadHook for F
where
    F: Fn(&Entry<'_>) -> ReadOutcome + Send + Sync,
{
    fn on_read(&self, entry: &Entry<'_>) -> ReadOutcome {
        self(entry)
    }
}

/// Finalizes a directory's children once every child has settled.
///
/// `children` arrives in settlement order, which is not deterministic.
/// Sort, filter or replace it in place; leaving it alone keeps it as is.
/// `node` is the directory's own node as produced by on-read.
pub trait ChildrenHook: Send + Sync {
    fn on_children(&self, dir: &Entry<'_>, node: &Node, children: &mut Vec<Node>);
}

impl<F> ChildrenHook for F
where
    F: Fn(&Entry<'_>, &Node, &mut Vec<Node>) + Send + Sync,
{
    fn on_children(&self, dir: &Entry<'_>, node: &Node, children: &mut Vec<Node>) {
        self(dir, node, children)
    }
}

/// Receives the finished tree and every recorded error, exactly once.
pub trait CompleteHook: Send + Sync {
    fn on_complete(&self, tree: &Node, errors: &[ErrorRecord]);
}

impl<F> CompleteHook for F
where
    F: Fn(&Node, &[ErrorRecord]) + Send + Sync,
{
    fn on_complete(&self, tree: &Node, errors: &[ErrorRecord]) {
        self(tree, errors)
    }
}

// ---------------------------------------------------------------------------
// FileSystem
// ---------------------------------------------------------------------------

/// The I/O the walker performs.
///
/// Implement this to walk something other than the local disk, or to wrap
/// [`TokioFs`] with caching, tracing or fault injection. Every method is a
/// suspension point of the walk.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// List the names of a directory's entries in the order the backend
    /// returns them. Names are raw so that entries which are not valid
    /// UTF-8 can still be joined back onto the directory path.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Retrieve metadata for `path`, following a final symlink when
    /// `follow_links` is set.
    async fn stat(&self, path: &Path, follow_links: bool) -> io::Result<Stat>;

    /// Read a file as UTF-8 text.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Resolve `path` to its canonical form. Used to detect directory
    /// cycles when symlinks are followed.
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl FileSystem for TokioFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }
        Ok(names)
    }

    async fn stat(&self, path: &Path, follow_links: bool) -> io::Result<Stat> {
        let meta = if follow_links {
            tokio::fs::metadata(path).await?
        } else {
            tokio::fs::symlink_metadata(path).await?
        };
        Ok(Stat::from(&meta))
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}
