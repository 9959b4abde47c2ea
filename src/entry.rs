use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

use crate::node::Ancestors;

/// The view of a filesystem entry handed to every hook.
///
/// Borrowed from the walker for the duration of a single hook call. Hooks
/// that want to keep any of it must copy what they need.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    /// Absolute path to the entry.
    pub path: &'a Path,

    /// The entry's base name.
    pub name: &'a str,

    /// Metadata obtained for the entry.
    pub stat: &'a Stat,

    /// Root-first chain of the entry's ancestor nodes. Empty for the root.
    pub ancestors: &'a Ancestors,

    /// Raw child file names in listing order. `Some` only for directories
    /// whose listing succeeded.
    pub child_files: Option<&'a [String]>,

    /// File text, populated only when content reading is enabled and the
    /// entry is a regular file.
    pub content: Option<&'a str>,
}

impl Entry<'_> {
    /// Depth below the root. Root = 0.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

/// The kind of a traversed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link. Only seen when links are not followed.
    Symlink,

    /// Anything else (device files, pipes, sockets, etc.).
    Other,
}

/// Filesystem metadata for one entry.
///
/// Timestamps are `None` where the platform does not provide them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub kind:     EntryKind,
    pub size:     u64,
    pub readonly: bool,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub created:  Option<SystemTime>,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

impl From<&Metadata> for Stat {
    fn from(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        let kind = if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        };

        Self {
            kind,
            size:     meta.len(),
            readonly: meta.permissions().readonly(),
            modified: meta.modified().ok(),
            accessed: meta.accessed().ok(),
            created:  meta.created().ok(),
        }
    }
}
