use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace, warn};

use crate::entry::{Entry, Stat};
use crate::error::{DirTreeError, ErrorKind, ErrorPolicy, ErrorRecord};
use crate::node::{Ancestors, FileInfo, Node};
use crate::results::{Tree, WalkStats};
use crate::traits::{ChildrenHook, CompleteHook, FileSystem, ReadHook, SkipFilter};

// ---------------------------------------------------------------------------
// WalkOptions
// ---------------------------------------------------------------------------

/// The normalized policy and hook bundle for one walk.
///
/// Built once by `TreeBuilder::run()` and only ever borrowed afterwards.
pub(crate) struct WalkOptions {
    pub child_key:      Arc<str>,
    pub listing_errors: ErrorPolicy,
    pub stat_errors:    ErrorPolicy,
    pub follow_links:   bool,
    pub read_content:   bool,
    pub fs:             Box<dyn FileSystem>,
    pub skip:           Box<dyn SkipFilter>,
    pub on_read:        Box<dyn ReadHook>,
    pub on_children:    Box<dyn ChildrenHook>,
    pub on_complete:    Box<dyn CompleteHook>,
}

// ---------------------------------------------------------------------------
// PendingChildren
// ---------------------------------------------------------------------------

/// Children of one directory that have not settled yet.
///
/// Owned by a single directory activation. Every child settles exactly once,
/// whatever its outcome, and the directory completes when this reaches zero.
#[derive(Debug)]
struct PendingChildren {
    remaining: usize,
}

impl PendingChildren {
    fn new(count: usize) -> Self {
        Self { remaining: count }
    }

    fn settle(&mut self) {
        debug_assert!(self.remaining > 0, "child settled twice");
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Walk the tree rooted at `root`, which must already be absolute.
///
/// Everything runs inside the calling task: the stats for a directory's
/// children are polled together and the walker reacts to each as it
/// settles, with no threads or locks held across suspension points.
pub(crate) async fn run(root: PathBuf, opts: WalkOptions) -> Result<Tree, DirTreeError> {
    let start = Instant::now();

    // The root is always resolved through symlinks.
    let stat = match opts.fs.stat(&root, true).await {
        Ok(stat) => stat,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DirTreeError::RootNotFound(root));
        }
        Err(source) => return Err(DirTreeError::Stat { path: root, source }),
    };

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    debug!(root = %root.display(), child_key = %opts.child_key, "starting walk");

    let walk = Walk::new(&opts);
    let node = if stat.is_dir() {
        let lineage = if opts.follow_links {
            match opts.fs.canonicalize(&root).await {
                Ok(canonical) => vec![canonical],
                Err(source) => return Err(DirTreeError::Stat { path: root, source }),
            }
        } else {
            Vec::new()
        };
        walk.walk_dir(root, name, stat, Ancestors::default(), lineage).await?
    } else {
        Some(walk.read_leaf(root, name, stat, Ancestors::default()).await)
    };
    let (errors, stats) = walk.finish(start.elapsed());

    debug!(
        files = stats.files,
        dirs = stats.dirs,
        skipped = stats.skipped,
        errors = errors.len(),
        "walk complete"
    );

    if let Some(node) = &node {
        opts.on_complete.on_complete(node, &errors);
    }

    Ok(Tree { root: node, errors, stats })
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// State shared by every activation of one walk.
struct Walk<'o> {
    opts:    &'o WalkOptions,
    errors:  Mutex<Vec<ErrorRecord>>,
    files:   AtomicUsize,
    dirs:    AtomicUsize,
    skipped: AtomicUsize,
}

type Settled = Result<Option<Node>, DirTreeError>;

impl<'o> Walk<'o> {
    fn new(opts: &'o WalkOptions) -> Self {
        Self {
            opts,
            errors:  Mutex::new(Vec::new()),
            files:   AtomicUsize::new(0),
            dirs:    AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        }
    }

    /// List `path`, read it, settle every child, then finalize its children.
    ///
    /// Resolves to `Ok(None)` when the listing failed and the listing policy
    /// suppressed the error. Such a directory is never read and its
    /// children hook never runs.
    ///
    /// `lineage` holds the canonical paths from the root down to `path`
    /// when symlinks are followed, and is empty otherwise.
    fn walk_dir<'a>(
        &'a self,
        path: PathBuf,
        name: String,
        stat: Stat,
        ancestors: Ancestors,
        lineage: Vec<PathBuf>,
    ) -> BoxFuture<'a, Settled> {
        Box::pin(async move {
            let names = match self.opts.fs.read_dir(&path).await {
                Ok(names) => names,
                Err(error) => {
                    self.report(ErrorKind::Listing, &path, error)?;
                    return Ok(None);
                }
            };
            self.dirs.fetch_add(1, Ordering::Relaxed);
            trace!(dir = %path.display(), entries = names.len(), "listed directory");

            let files = names.iter().map(|n| n.to_string_lossy().into_owned()).collect();
            let mut node = self.read_node(FileInfo::new(path, name, stat, ancestors, Some(files), None));
            let mut children = Vec::new();

            if !names.is_empty() {
                let mut pending = PendingChildren::new(names.len());
                let child_ancestors = node.ancestors().with_parent(Arc::new(node.clone()));
                let lineage: Arc<[PathBuf]> = lineage.into();

                // Join on the raw name so non-UTF-8 entries keep their real path.
                let mut inflight: FuturesUnordered<_> = names
                    .iter()
                    .map(|raw| {
                        self.inspect(
                            node.path().join(raw),
                            raw.to_string_lossy().into_owned(),
                            child_ancestors.clone(),
                            Arc::clone(&lineage),
                        )
                    })
                    .collect();

                // A thrown error fails this directory, but siblings already
                // dispatched are still driven to their own conclusion.
                let mut thrown: Option<DirTreeError> = None;
                while !pending.is_complete() {
                    let Some(settled) = inflight.next().await else {
                        break;
                    };
                    pending.settle();
                    match settled {
                        Ok(Some(child)) => children.push(child),
                        Ok(None) => {}
                        Err(err) if thrown.is_none() => thrown = Some(err),
                        Err(err) => {
                            warn!(dir = %node.path().display(), error = %err, "branch already failed, discarding error");
                        }
                    }
                }

                if let Some(err) = thrown {
                    return Err(err);
                }
            }

            self.opts.on_children.on_children(&node.info().as_entry(), &node, &mut children);
            node.set_children(children);
            Ok(Some(node))
        })
    }

    /// Stat one child, then skip it, read it as a leaf, or descend into it.
    fn inspect<'a>(
        &'a self,
        path: PathBuf,
        name: String,
        ancestors: Ancestors,
        lineage: Arc<[PathBuf]>,
    ) -> BoxFuture<'a, Settled> {
        Box::pin(async move {
            let stat = match self.opts.fs.stat(&path, self.opts.follow_links).await {
                Ok(stat) => stat,
                Err(error) => {
                    self.report(ErrorKind::Stat, &path, error)?;
                    return Ok(None);
                }
            };

            let entry = Entry {
                path:        &path,
                name:        &name,
                stat:        &stat,
                ancestors:   &ancestors,
                child_files: None,
                content:     None,
            };
            if self.opts.skip.is_skip(&entry) {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                trace!(path = %path.display(), "skipped");
                return Ok(None);
            }

            if stat.is_dir() {
                let lineage = match self.descend(&path, &lineage).await {
                    Ok(lineage) => lineage,
                    Err(error) => {
                        self.report(ErrorKind::Stat, &path, error)?;
                        return Ok(None);
                    }
                };
                return self.walk_dir(path, name, stat, ancestors, lineage).await;
            }
            Ok(Some(self.read_leaf(path, name, stat, ancestors).await))
        })
    }

    /// Extend `lineage` with the canonical form of `path`. Fails when that
    /// directory is already one of its own ancestors, i.e. a followed
    /// symlink leads back up the tree.
    async fn descend(&self, path: &Path, lineage: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
        if !self.opts.follow_links {
            return Ok(Vec::new());
        }
        let canonical = self.opts.fs.canonicalize(path).await?;
        if lineage.contains(&canonical) {
            return Err(io::Error::other(format!(
                "filesystem loop back to {}",
                canonical.display()
            )));
        }
        let mut next = lineage.to_vec();
        next.push(canonical);
        Ok(next)
    }

    /// Read a non-directory entry, loading its text first when enabled.
    async fn read_leaf(&self, path: PathBuf, name: String, stat: Stat, ancestors: Ancestors) -> Node {
        let content = if self.opts.read_content && stat.is_file() {
            let text = self.opts.fs.read_to_string(&path).await.unwrap_or_else(|error| {
                trace!(path = %path.display(), %error, "unreadable content, using empty text");
                String::new()
            });
            Some(text)
        } else {
            None
        };

        self.files.fetch_add(1, Ordering::Relaxed);
        self.read_node(FileInfo::new(path, name, stat, ancestors, None, content))
    }

    fn read_node(&self, info: FileInfo) -> Node {
        let outcome = self.opts.on_read.on_read(&info.as_entry());
        Node::from_outcome(info, outcome, Arc::clone(&self.opts.child_key))
    }

    /// Apply the policy configured for `kind`. `Err` means the caller must
    /// abandon its branch.
    fn report(&self, kind: ErrorKind, path: &Path, error: io::Error) -> Result<(), DirTreeError> {
        let policy = match kind {
            ErrorKind::Listing => self.opts.listing_errors,
            ErrorKind::Stat    => self.opts.stat_errors,
        };
        let record = ErrorRecord { kind, path: path.to_path_buf(), error };

        match policy {
            ErrorPolicy::Ignore => {
                trace!(%record, "ignoring");
                Ok(())
            }
            ErrorPolicy::Record => {
                debug!(%record, "recording");
                self.errors
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(record);
                Ok(())
            }
            ErrorPolicy::Throw => Err(record.into_error()),
        }
    }

    fn finish(self, duration: Duration) -> (Vec<ErrorRecord>, WalkStats) {
        let errors = self.errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        let stats = WalkStats {
            files:   self.files.into_inner(),
            dirs:    self.dirs.into_inner(),
            skipped: self.skipped.into_inner(),
            duration,
        };
        (errors, stats)
    }
}
