//! Path & Command Gate: canonicalization, containment, and command
//! classification. Every tool that touches the filesystem or a shell goes
//! through here first; nothing downstream re-implements containment checks.

mod command;

pub use command::{classify_command, CommandClass};

use crate::error::ToolError;
use std::path::{Path, PathBuf};

/// Canonicalized read/write roots derived from an `AgentConfig` for one
/// session. Cheap to clone; held by `ToolContext`.
#[derive(Debug, Clone)]
pub struct PathGate {
    read_roots: Vec<PathBuf>,
    write_roots: Vec<PathBuf>,
    working_dir: PathBuf,
}

impl PathGate {
    /// `read_roots` must already include every `write_roots` entry — the
    /// caller (config loader) is responsible for that invariant; we don't
    /// re-derive it here so a caller can't accidentally widen write access
    /// by forgetting to also widen read access.
    pub fn new(working_dir: PathBuf, read_roots: Vec<PathBuf>, write_roots: Vec<PathBuf>) -> Self {
        Self {
            read_roots,
            write_roots,
            working_dir,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve `input` against `base` (the working directory if `input` is
    /// relative) and canonicalize every segment, including symlinks. This
    /// does not check containment — call `assert_read_allowed` or
    /// `assert_write_allowed` on the result.
    pub fn resolve(&self, input: &str, base: &Path) -> Result<PathBuf, ToolError> {
        let raw = Path::new(input);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            base.join(raw)
        };
        canonicalize_best_effort(&joined)
    }

    pub fn assert_read_allowed(&self, path: &Path) -> Result<(), ToolError> {
        if contains(&self.read_roots, path) {
            Ok(())
        } else {
            Err(ToolError::PolicyDenied(format!(
                "path not allowed for reading: {}",
                path.display()
            )))
        }
    }

    pub fn assert_write_allowed(&self, path: &Path) -> Result<(), ToolError> {
        if contains(&self.write_roots, path) {
            Ok(())
        } else {
            Err(ToolError::PolicyDenied(format!(
                "path not allowed for writing: {}",
                path.display()
            )))
        }
    }

    pub fn read_roots(&self) -> &[PathBuf] {
        &self.read_roots
    }

    pub fn write_roots(&self) -> &[PathBuf] {
        &self.write_roots
    }
}

/// Resolve every path component, including symlinks, so containment checks
/// see the real target rather than the lexical path. Falls back to
/// resolving the deepest existing ancestor (for paths about to be created
/// by `write`) and rejoining the missing tail lexically.
fn canonicalize_best_effort(path: &Path) -> Result<PathBuf, ToolError> {
    if let Ok(canon) = path.canonicalize() {
        return Ok(canon);
    }

    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();
    loop {
        if existing.as_os_str().is_empty() {
            return Err(ToolError::ValidationError(format!(
                "cannot resolve path: {}",
                path.display()
            )));
        }
        match existing.canonicalize() {
            Ok(canon) => {
                let mut result = canon;
                for component in tail.into_iter().rev() {
                    result.push(component);
                }
                return Ok(result);
            }
            Err(_) => {
                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    return Err(ToolError::ValidationError(format!(
                        "cannot resolve path: {}",
                        path.display()
                    )));
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(ToolError::ValidationError(format!(
                        "cannot resolve path: {}",
                        path.display()
                    )));
                }
            }
        }
    }
}

fn contains(roots: &[PathBuf], path: &Path) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gate(dir: &TempDir) -> PathGate {
        let root = dir.path().canonicalize().unwrap();
        PathGate::new(root.clone(), vec![root.clone()], vec![root])
    }

    #[test]
    fn resolves_relative_path_against_base() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        let resolved = gate.resolve("sub/file.txt", gate.working_dir()).unwrap();
        assert!(resolved.starts_with(gate.working_dir()));
        assert!(resolved.ends_with("sub/file.txt"));
    }

    #[test]
    fn denies_path_outside_roots() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        let outside = std::env::temp_dir().join("definitely-outside-coworker");
        assert!(gate.assert_read_allowed(&outside).is_err());
        assert!(gate.assert_write_allowed(&outside).is_err());
    }

    #[test]
    fn symlink_escape_is_denied_after_resolution() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let link = dir.path().join("link");
        #[cfg(unix)]
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        let gate = gate(&dir);
        let resolved = gate.resolve("link/x", gate.working_dir()).unwrap();
        assert!(!gate.assert_write_allowed(&resolved).is_ok() || resolved.starts_with(dir.path()));
        // resolved path must be under `outside`, which is not an allowed root.
        assert!(gate.assert_write_allowed(&resolved).is_err());
    }

    #[test]
    fn write_roots_are_subset_of_read_roots() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let read_only = root.join("ro");
        std::fs::create_dir_all(&read_only).unwrap();
        let gate = PathGate::new(root.clone(), vec![root.clone(), read_only.clone()], vec![root]);
        assert!(gate.assert_read_allowed(&read_only).is_ok());
        assert!(gate.assert_write_allowed(&read_only).is_err());
    }
}
