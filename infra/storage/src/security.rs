use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn traversal(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

/// Collapses `.` and `..` lexically, refusing to climb above the sandbox root.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for c in path.components() {
        match c {
            Component::CurDir => {},
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(traversal(path, "Path attempted to escape sandbox via '..'"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(traversal(path, "Absolute paths are not allowed in sandbox"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(traversal(path, "Path does not name a file"));
    }
    Ok(out)
}

/// Joins a relative path to the canonical `root`, ensuring the result stays inside it.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();
    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => Err(traversal(&canonical, "Path resolves outside the sandbox")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_ancestors(root, joined),
        Err(e) => Err(StorageError::Io { source: e, context: None }),
    }
}

/// Validates a path that does not exist yet through its first existing ancestor,
/// so a symlinked parent cannot redirect writes out of the sandbox.
fn validate_ancestors(root: &Path, joined: PathBuf) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(path) = current {
        if path == root {
            return Ok(joined);
        }
        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined),
                Ok(canonical) => {
                    Err(traversal(&canonical, "Existing parent directory is a symlink outside sandbox"))
                },
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }
        current = path.parent();
    }

    Err(traversal(&joined, "No valid parent directory found within sandbox"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert!(resolve_path(&root, "../etc/passwd").is_err());
        assert!(resolve_path(&root, "a/../../b").is_err());
        assert!(resolve_path(&root, "/etc/passwd").is_err());
        assert!(resolve_path(&root, ".").is_err());
    }

    #[test]
    fn accepts_nested_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let resolved = resolve_path(&root, "nested/./deeper/app.db").unwrap();
        assert_eq!(resolved, root.join("nested/deeper/app.db"));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlinked_parents() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        assert!(matches!(
            resolve_path(&root, "link/app.db"),
            Err(StorageError::PathTraversalAttempt { .. })
        ));
    }
}
