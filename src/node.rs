use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::entry::{Entry, Stat};

/// Field under which a scalar [`ReadOutcome`] is stored.
pub const SCALAR_FIELD: &str = "value";

/// Field under which a node's [`FileInfo`] is serialized.
pub const FILE_INFO_FIELD: &str = "fileInfo";

// ---------------------------------------------------------------------------
// ReadOutcome
// ---------------------------------------------------------------------------

/// What an on-read hook produced for an entry.
///
/// Every variant is normalized into a [`Node`]: `Unset` yields a node with
/// metadata only, `Object` contributes its fields, and `Scalar` is stored
/// under [`SCALAR_FIELD`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReadOutcome {
    #[default]
    Unset,
    Object(Map<String, Value>),
    Scalar(Value),
}

impl From<()> for ReadOutcome {
    fn from(_: ()) -> Self {
        Self::Unset
    }
}

impl From<Map<String, Value>> for ReadOutcome {
    fn from(map: Map<String, Value>) -> Self {
        Self::Object(map)
    }
}

impl From<Value> for ReadOutcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Null        => Self::Unset,
            Value::Object(map) => Self::Object(map),
            other              => Self::Scalar(other),
        }
    }
}

impl From<String> for ReadOutcome {
    fn from(s: String) -> Self {
        Self::Scalar(Value::String(s))
    }
}

impl From<&str> for ReadOutcome {
    fn from(s: &str) -> Self {
        Self::Scalar(Value::String(s.to_owned()))
    }
}

impl<T: Into<ReadOutcome>> From<Option<T>> for ReadOutcome {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Ancestors
// ---------------------------------------------------------------------------

/// Root-first chain of a node's ancestors.
///
/// A persistent list: extending it for a child shares every existing link,
/// so siblings and descendants never copy the chain. Each ancestor is the
/// directory node as produced by on-read, before its children were attached.
#[derive(Clone, Default)]
pub struct Ancestors {
    last: Option<Arc<Link>>,
    len:  usize,
}

struct Link {
    node:   Arc<Node>,
    parent: Option<Arc<Link>>,
}

impl Ancestors {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The closest ancestor, i.e. the entry's parent directory.
    pub fn parent(&self) -> Option<&Node> {
        self.last.as_deref().map(|link| &*link.node)
    }

    /// The topmost ancestor, i.e. the walk root.
    pub fn root(&self) -> Option<&Node> {
        self.nearest_first().last()
    }

    /// Iterate from the parent up to the root. Walks the links in place.
    pub fn nearest_first(&self) -> NearestFirst<'_> {
        NearestFirst { cursor: self.last.as_deref() }
    }

    /// Iterate from the root down to the parent.
    ///
    /// The chain is stored parent-first, so this collects it into a `Vec`
    /// of `len()` references first. Use [`nearest_first`](Self::nearest_first)
    /// when order does not matter.
    pub fn iter(&self) -> std::vec::IntoIter<&Node> {
        self.to_vec().into_iter()
    }

    /// Collect the chain root-first.
    pub fn to_vec(&self) -> Vec<&Node> {
        let mut nodes = Vec::with_capacity(self.len);
        nodes.extend(self.nearest_first());
        nodes.reverse();
        nodes
    }

    /// A new chain with `node` appended as the innermost ancestor.
    pub(crate) fn with_parent(&self, node: Arc<Node>) -> Self {
        Self {
            last: Some(Arc::new(Link { node, parent: self.last.clone() })),
            len:  self.len + 1,
        }
    }
}

/// Parent-to-root iterator over [`Ancestors`].
#[derive(Clone)]
pub struct NearestFirst<'a> {
    cursor: Option<&'a Link>,
}

impl<'a> Iterator for NearestFirst<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.cursor?;
        self.cursor = link.parent.as_deref();
        Some(&*link.node)
    }
}

impl fmt::Debug for Ancestors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|n| n.name())).finish()
    }
}

// ---------------------------------------------------------------------------
// FileInfo
// ---------------------------------------------------------------------------

/// Metadata the walker derives for every node, independent of hooks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path:  PathBuf,
    pub name:  String,
    pub stat:  Stat,
    pub depth: usize,

    #[serde(skip)]
    pub ancestors: Ancestors,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_files: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileInfo {
    pub(crate) fn new(
        path: PathBuf,
        name: String,
        stat: Stat,
        ancestors: Ancestors,
        child_files: Option<Vec<String>>,
        content: Option<String>,
    ) -> Self {
        Self {
            depth: ancestors.len(),
            path,
            name,
            stat,
            ancestors,
            child_files,
            content,
        }
    }

    /// Borrow this metadata as the [`Entry`] view hooks receive.
    pub fn as_entry(&self) -> Entry<'_> {
        Entry {
            path:        &self.path,
            name:        &self.name,
            stat:        &self.stat,
            ancestors:   &self.ancestors,
            child_files: self.child_files.as_deref(),
            content:     self.content.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One filesystem entry in the result tree.
///
/// Carries the walker's [`FileInfo`], the fields contributed by the on-read
/// hook, and, for directories only, the child nodes. Serializes to a flat
/// JSON object with children under the configured child key.
#[derive(Debug, Clone)]
pub struct Node {
    info:      FileInfo,
    fields:    Map<String, Value>,
    children:  Option<Vec<Node>>,
    child_key: Arc<str>,
}

impl Node {
    /// Normalize an on-read result into a node. Directories always get an
    /// empty child list, which replaces any hook field of the same name.
    pub(crate) fn from_outcome(info: FileInfo, outcome: ReadOutcome, child_key: Arc<str>) -> Self {
        let mut fields = match outcome {
            ReadOutcome::Unset       => Map::new(),
            ReadOutcome::Object(map) => map,
            ReadOutcome::Scalar(v)   => {
                let mut map = Map::new();
                map.insert(SCALAR_FIELD.to_owned(), v);
                map
            }
        };

        let children = if info.stat.is_dir() {
            fields.remove(&*child_key);
            Some(Vec::new())
        } else {
            None
        };

        Self { info, fields, children, child_key }
    }

    // ── Derived metadata ──────────────────────────────────────────────────

    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn stat(&self) -> &Stat {
        &self.info.stat
    }

    pub fn ancestors(&self) -> &Ancestors {
        &self.info.ancestors
    }

    /// Depth below the root. Always equals `ancestors().len()`.
    pub fn depth(&self) -> usize {
        self.info.depth
    }

    /// Raw child file names as listed. `None` for files.
    pub fn child_files(&self) -> Option<&[String]> {
        self.info.child_files.as_deref()
    }

    /// File text, when content reading was enabled.
    pub fn content(&self) -> Option<&str> {
        self.info.content.as_deref()
    }

    // ── Hook fields ───────────────────────────────────────────────────────

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    // ── Children ──────────────────────────────────────────────────────────

    /// The name children are serialized under.
    pub fn child_key(&self) -> &str {
        &self.child_key
    }

    /// `true` when the node carries a child list, i.e. it is a directory.
    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    /// Child nodes. `None` for anything that is not a directory.
    pub fn children(&self) -> Option<&[Node]> {
        self.children.as_deref()
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.children.as_mut()
    }

    pub(crate) fn set_children(&mut self, children: Vec<Node>) {
        if self.children.is_some() {
            self.children = Some(children);
        }
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Pre-order, depth-first iterator over this node and its descendants.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Level-order iterator over this node and its descendants.
    pub fn iter_breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst { queue: VecDeque::from([self]) }
    }

    /// Find the node for `path` in this subtree.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<&Node> {
        let path = path.as_ref();
        self.iter().find(|n| n.path() == path)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.fields {
            if key == FILE_INFO_FIELD || (self.children.is_some() && key.as_str() == &*self.child_key) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(FILE_INFO_FIELD, &self.info)?;
        if let Some(children) = &self.children {
            map.serialize_entry(&*self.child_key, children)?;
        }
        map.end()
    }
}

/// Depth-first iterator returned by [`Node::iter`].
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(children) = node.children() {
            self.stack.extend(children.iter().rev());
        }
        Some(node)
    }
}

/// Breadth-first iterator returned by [`Node::iter_breadth_first`].
pub struct BreadthFirst<'a> {
    queue: VecDeque<&'a Node>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        if let Some(children) = node.children() {
            self.queue.extend(children.iter());
        }
        Some(node)
    }
}
