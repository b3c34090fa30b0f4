//! In-memory mock filesystem for testing collectors without real devices.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory filesystem for testing.
///
/// Stores files and device nodes in memory, allowing tests to simulate
/// `/sys/block` and `/dev` states. Clones are cheap; mutating a clone
/// leaves the others untouched.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: Arc<HashMap<PathBuf, String>>,
    /// Paths that exist but have no readable content (device nodes, dirs).
    nodes: Arc<HashSet<PathBuf>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        Arc::make_mut(&mut self.files).insert(path, content.into());
    }

    /// Adds an existing path without content, such as `/dev/sda`.
    pub fn add_node(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        Arc::make_mut(&mut self.nodes).insert(path);
    }

    /// Adds a `/sys/block/<name>/queue/rotational` flag.
    pub fn add_rotational(&mut self, name: &str, rotational: bool) {
        let flag = if rotational { "1\n" } else { "0\n" };
        self.add_file(format!("/sys/block/{}/queue/rotational", name), flag);
    }

    fn add_parents(&mut self, path: &Path) {
        let nodes = Arc::make_mut(&mut self.nodes);
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                nodes.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.nodes.contains(path)
    }
}
