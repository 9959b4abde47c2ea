use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::config::{WalkConfig, DEFAULT_CHILD_KEY};
use crate::engine::{run, WalkOptions};
use crate::entry::Entry;
use crate::error::{DirTreeError, ErrorPolicy, ErrorRecord};
use crate::node::{Node, ReadOutcome};
use crate::results::Tree;
use crate::traits::{ChildrenHook, CompleteHook, FileSystem, ReadHook, SkipFilter, TokioFs};

// ---------------------------------------------------------------------------
// TreeBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and running a walk.
///
/// Created via [`dirtree::walk()`](crate::walk). Configure with chained
/// builder methods, then await [`run()`](TreeBuilder::run).
///
/// # Example
///
/// ```rust,ignore
/// let tree = dirtree::walk("docs")
///     .child_key("items")
///     .stat_errors(ErrorPolicy::Record)
///     .skip_matching("node_modules")
///     .on_read(|e: &Entry<'_>| json!({ "text": e.name }))
///     .on_children(|_, _, children: &mut Vec<Node>| children.sort_by(|a, b| a.name().cmp(b.name())))
///     .run()
///     .await?;
/// ```
pub struct TreeBuilder {
    root:           PathBuf,
    child_key:      String,
    listing_errors: ErrorPolicy,
    stat_errors:    ErrorPolicy,
    follow_links:   bool,
    read_content:   bool,
    skip_patterns:  Vec<String>,
    fs:             Option<Box<dyn FileSystem>>,
    skip:           Option<Box<dyn SkipFilter>>,
    on_read:        Option<Box<dyn ReadHook>>,
    on_children:    Option<Box<dyn ChildrenHook>>,
    on_complete:    Option<Box<dyn CompleteHook>>,
}

impl TreeBuilder {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            child_key:      DEFAULT_CHILD_KEY.to_owned(),
            listing_errors: ErrorPolicy::default(),
            stat_errors:    ErrorPolicy::default(),
            follow_links:   true,
            read_content:   false,
            skip_patterns:  Vec::new(),
            fs:             None,
            skip:           None,
            on_read:        None,
            on_children:    None,
            on_complete:    None,
        }
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Field name directory children are serialized under.
    /// Defaults to `"children"`; an empty key falls back to the default.
    pub fn child_key(mut self, key: impl Into<String>) -> Self {
        self.child_key = key.into();
        self
    }

    /// What to do when a directory cannot be listed. Defaults to ignore.
    pub fn listing_errors(mut self, policy: ErrorPolicy) -> Self {
        self.listing_errors = policy;
        self
    }

    /// What to do when an entry cannot be statted. Defaults to ignore.
    pub fn stat_errors(mut self, policy: ErrorPolicy) -> Self {
        self.stat_errors = policy;
        self
    }

    /// Resolve symlinks when statting entries. Enabled by default.
    ///
    /// When disabled, symlinks become leaf entries of kind
    /// [`EntryKind::Symlink`](crate::EntryKind::Symlink). The root is
    /// always resolved.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Read every regular file's text before on-read sees it.
    ///
    /// Disabled by default. Unreadable files get empty content.
    pub fn read_content(mut self, yes: bool) -> Self {
        self.read_content = yes;
        self
    }

    /// Apply every setting from a [`WalkConfig`], replacing earlier ones.
    pub fn config(mut self, config: &WalkConfig) -> Self {
        self.child_key = config.child_key.clone();
        self.listing_errors = config.listing_errors;
        self.stat_errors = config.stat_errors;
        self.follow_links = config.follow_links;
        self.read_content = config.read_content;
        self.skip_patterns = config.skip_patterns.clone();
        self
    }

    // ── I/O ───────────────────────────────────────────────────────────────

    /// Walk through a custom [`FileSystem`] instead of [`TokioFs`].
    pub fn filesystem(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Some(Box::new(fs));
        self
    }

    // ── Skipping ──────────────────────────────────────────────────────────

    /// Skip entries for which `f` returns `true`.
    pub fn skip_if<F>(self, f: F) -> Self
    where
        F: Fn(&Entry<'_>) -> bool + Send + Sync + 'static,
    {
        self.with_skip_filter(f)
    }

    /// Set a custom [`SkipFilter`].
    pub fn with_skip_filter(mut self, filter: impl SkipFilter + 'static) -> Self {
        self.skip = Some(Box::new(filter));
        self
    }

    /// Skip entries matching a gitignore-style glob, relative to the root.
    ///
    /// Patterns are combined with any custom skip filter: an entry is
    /// skipped when either says so.
    pub fn skip_matching(mut self, pattern: impl Into<String>) -> Self {
        self.skip_patterns.push(pattern.into());
        self
    }

    // ── Hooks ─────────────────────────────────────────────────────────────

    /// Produce each node's fields. Anything convertible into a
    /// [`ReadOutcome`] works: `()`, a `serde_json::Value`, a map, a string.
    pub fn on_read<F, R>(self, f: F) -> Self
    where
        F: Fn(&Entry<'_>) -> R + Send + Sync + 'static,
        R: Into<ReadOutcome>,
    {
        self.with_read_hook(move |entry: &Entry<'_>| -> ReadOutcome { f(entry).into() })
    }

    pub fn with_read_hook(mut self, hook: impl ReadHook + 'static) -> Self {
        self.on_read = Some(Box::new(hook));
        self
    }

    /// Finalize each directory's children, e.g. to sort them.
    pub fn on_children<F>(self, f: F) -> Self
    where
        F: Fn(&Entry<'_>, &Node, &mut Vec<Node>) + Send + Sync + 'static,
    {
        self.with_children_hook(f)
    }

    pub fn with_children_hook(mut self, hook: impl ChildrenHook + 'static) -> Self {
        self.on_children = Some(Box::new(hook));
        self
    }

    /// Observe the finished tree and recorded errors.
    pub fn on_complete<F>(self, f: F) -> Self
    where
        F: Fn(&Node, &[ErrorRecord]) + Send + Sync + 'static,
    {
        self.with_complete_hook(f)
    }

    pub fn with_complete_hook(mut self, hook: impl CompleteHook + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Walk the tree.
    ///
    /// # Errors
    ///
    /// Fails with [`DirTreeError::RootNotFound`] when the root does not
    /// exist, with [`DirTreeError::InvalidPattern`] for a bad skip glob, and
    /// with the first listing or stat error whose policy is
    /// [`ErrorPolicy::Throw`]. Under the other policies those errors never
    /// fail the walk.
    pub async fn run(self) -> Result<Tree, DirTreeError> {
        let root = std::path::absolute(&self.root)
            .map_err(|_| DirTreeError::RootNotFound(self.root.clone()))?;

        let child_key: Arc<str> = if self.child_key.is_empty() {
            Arc::from(DEFAULT_CHILD_KEY)
        } else {
            Arc::from(self.child_key)
        };

        let skip: Box<dyn SkipFilter> = match (self.skip, self.skip_patterns.is_empty()) {
            (None, true)         => Box::new(NeverSkip),
            (Some(custom), true) => custom,
            (custom, false)      => Box::new(PatternSkip {
                globs: build_globs(&root, &self.skip_patterns)?,
                custom,
            }),
        };

        let opts = WalkOptions {
            child_key,
            listing_errors: self.listing_errors,
            stat_errors:    self.stat_errors,
            follow_links:   self.follow_links,
            read_content:   self.read_content,
            fs:             self.fs.unwrap_or_else(|| Box::new(TokioFs)),
            skip,
            on_read:        self.on_read.unwrap_or_else(|| Box::new(MetadataOnly)),
            on_children:    self.on_children.unwrap_or_else(|| Box::new(KeepChildren)),
            on_complete:    self.on_complete.unwrap_or_else(|| Box::new(NoOp)),
        };

        run(root, opts).await
    }
}

// ---------------------------------------------------------------------------
// Built-in hooks
// ---------------------------------------------------------------------------

/// Never skips. Used when no skip filter or pattern is configured.
struct NeverSkip;

impl SkipFilter for NeverSkip {
    fn is_skip(&self, _entry: &Entry<'_>) -> bool {
        false
    }
}

/// Skips entries matching gitignore-style globs, or a custom filter.
struct PatternSkip {
    globs:  Gitignore,
    custom: Option<Box<dyn SkipFilter>>,
}

impl SkipFilter for PatternSkip {
    fn is_skip(&self, entry: &Entry<'_>) -> bool {
        self.globs.matched(entry.path, entry.stat.is_dir()).is_ignore()
            || self.custom.as_ref().is_some_and(|c| c.is_skip(entry))
    }
}

/// Yields metadata-only nodes. Used when no on-read hook is set.
struct MetadataOnly;

impl ReadHook for MetadataOnly {
    fn on_read(&self, _entry: &Entry<'_>) -> ReadOutcome {
        ReadOutcome::Unset
    }
}

/// Leaves children in settlement order.
struct KeepChildren;

impl ChildrenHook for KeepChildren {
    fn on_children(&self, _dir: &Entry<'_>, _node: &Node, _children: &mut Vec<Node>) {}
}

struct NoOp;

impl CompleteHook for NoOp {
    fn on_complete(&self, _tree: &Node, _errors: &[ErrorRecord]) {}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_globs(root: &Path, patterns: &[String]) -> Result<Gitignore, DirTreeError> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| DirTreeError::InvalidPattern(format!("{pattern}: {e}")))?;
    }
    builder
        .build()
        .map_err(|e| DirTreeError::InvalidPattern(e.to_string()))
}
