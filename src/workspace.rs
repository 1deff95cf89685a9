//! File-system and editor collaborators used by the host router.

use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::HostError;

pub const MAX_LISTED_FILES: usize = 1000;
const EXCLUDED_DIR: &str = "node_modules";

/// The open workspace folders. All file I/O is relative to the first one.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    roots: Vec<PathBuf>,
}

impl Workspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn first_root(&self) -> Option<&Path> {
        self.roots.first().map(PathBuf::as_path)
    }

    /// Resolve a workspace-relative path against the first root. Backslashes
    /// become forward slashes and leading separators are dropped, so the path
    /// is always appended to the root rather than replacing it. Paths that
    /// climb out of the root with `..` are refused; `io_err` turns that refusal
    /// into the caller's read or write error.
    pub fn resolve(
        &self,
        operation: &'static str,
        relative: &str,
        io_err: impl FnOnce(io::Error) -> HostError,
    ) -> Result<PathBuf, HostError> {
        let root = self
            .first_root()
            .ok_or(HostError::NoWorkspace { operation })?;
        confine(root, relative).map_err(io_err)
    }

    pub async fn read_text(&self, relative: &str) -> Result<String, HostError> {
        let read_err = |source| HostError::Read {
            path: relative.to_string(),
            source,
        };
        let path = self.resolve("getFileContent", relative, read_err)?;
        let bytes = tokio::fs::read(&path).await.map_err(read_err)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Overwrite a file with new text, creating parent folders as needed.
    pub async fn write_text(&self, relative: &str, text: &str) -> Result<PathBuf, HostError> {
        let write_err = |source| HostError::Write {
            path: relative.to_string(),
            source,
        };
        let path = self.resolve("applyCodeEdit", relative, write_err)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&path, text.as_bytes())
            .await
            .map_err(write_err)?;
        Ok(path)
    }

    /// Files with an extension under the first root, skipping dependency
    /// folders, as sorted forward-slash relative paths.
    pub async fn list_files(&self) -> Result<Vec<String>, HostError> {
        let root = self
            .first_root()
            .ok_or(HostError::NoWorkspace {
                operation: "getWorkspaceFiles",
            })?
            .to_path_buf();

        tokio::task::spawn_blocking(move || collect_files(&root, MAX_LISTED_FILES))
            .await
            .map_err(|e| HostError::Listing(e.to_string()))
    }
}

/// Join `relative` under `root` without ever leaving it.
fn confine(root: &Path, relative: &str) -> io::Result<PathBuf> {
    let normalized = normalize_separators(relative);
    let mut resolved = root.to_path_buf();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "path leaves the workspace folder",
                ));
            }
        }
    }
    Ok(resolved)
}

fn collect_files(root: &Path, limit: usize) -> Vec<String> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != EXCLUDED_DIR)
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().contains('.'))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|rel| normalize_separators(&rel.to_string_lossy()))
        })
        .take(limit)
        .collect()
}

pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// A snapshot of one editor's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDocument {
    pub file_name: String,
    pub text: String,
}

/// Source of "what the user currently has open".
pub trait EditorView: Send + Sync {
    fn visible_documents(&self) -> Vec<EditorDocument>;

    /// The first visible document whose text is not blank.
    fn active_context(&self) -> Option<EditorDocument> {
        self.visible_documents()
            .into_iter()
            .find(|doc| !doc.text.trim().is_empty())
    }
}

/// Files passed on the command line stand in for visible editors. They are
/// re-read on every query so the snapshot is current.
#[derive(Debug, Clone, Default)]
pub struct OpenEditors {
    paths: Vec<PathBuf>,
}

impl OpenEditors {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl EditorView for OpenEditors {
    fn visible_documents(&self) -> Vec<EditorDocument> {
        self.paths
            .iter()
            .filter_map(|path| {
                let text = std::fs::read_to_string(path).ok()?;
                Some(EditorDocument {
                    file_name: path.to_string_lossy().into_owned(),
                    text,
                })
            })
            .collect()
    }
}
