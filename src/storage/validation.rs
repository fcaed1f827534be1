//! Path validation
//!
//! Confines client-supplied logical paths to the storage root. The check is
//! purely lexical: targets need not exist, so mkdir and upload destinations
//! are validated the same way as listings and downloads.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Logical path of the storage root itself
pub const ROOT_LOGICAL: &str = "/";

/// A logical path that has been confined to the storage root.
///
/// Only [`PathResolver`] can construct one, so holding a `ResolvedPath` is
/// proof that the confinement check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    logical: String,
    real: PathBuf,
}

impl ResolvedPath {
    /// Normalized logical form, always starting with `/`
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Absolute filesystem path inside the storage root
    pub fn real(&self) -> &Path {
        &self.real
    }

    pub fn is_root(&self) -> bool {
        self.logical == ROOT_LOGICAL
    }

    /// Last logical segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.logical.rsplit('/').next()
        }
    }
}

/// Resolves logical paths against a fixed storage root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// `root` is expected to be absolute; the server canonicalizes it at startup.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates `logical` and joins it onto the storage root.
    ///
    /// Empty input means the root. Any `..` that would climb above the root
    /// rejects the whole path rather than being clamped.
    pub fn resolve(&self, logical: &str) -> Result<ResolvedPath, PathError> {
        let normalized = normalize_logical(logical)?;

        let mut real = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            real.push(segment);
        }

        // The joined result must still be the root or strictly below it
        match real.strip_prefix(&self.root) {
            Ok(rel) if rel.components().all(|c| matches!(c, Component::Normal(_))) => {}
            _ => return Err(PathError::Escape(logical.to_string())),
        }

        Ok(ResolvedPath {
            logical: normalized,
            real,
        })
    }

    /// Resolves `name` beneath an already validated parent
    pub fn resolve_child(&self, parent: &ResolvedPath, name: &str) -> Result<ResolvedPath, PathError> {
        self.resolve(&join_logical(parent.logical(), name))
    }
}

/// Lexically normalizes a logical path.
///
/// Both `/` and `\` separate segments, empty and `.` segments are dropped,
/// and `..` pops the previous segment. Popping past the root is an escape.
pub fn normalize_logical(path: &str) -> Result<String, PathError> {
    if path.contains('\0') {
        return Err(PathError::Malformed(path.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Escape(path.to_string()));
                }
            }
            name => segments.push(name),
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Appends `name` to a logical directory path without normalizing
pub fn join_logical(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("/srv/uploads")
    }

    #[test]
    fn test_empty_and_slash_resolve_to_root() {
        let r = resolver();
        for input in ["", "/", "//", "/./", "."] {
            let resolved = r.resolve(input).unwrap();
            assert!(resolved.is_root(), "{input:?} should be root");
            assert_eq!(resolved.real(), Path::new("/srv/uploads"));
        }
    }

    #[test]
    fn test_traversal_is_rejected() {
        let r = resolver();
        for input in [
            "..",
            "/..",
            "/../../etc",
            "docs/../../etc/passwd",
            "/docs/..//../",
            "a/b/../../..",
            "..\\..\\etc",
            "docs\\..\\..\\secret",
            "/docs/./../.././x",
        ] {
            assert!(
                matches!(r.resolve(input), Err(PathError::Escape(_))),
                "{input:?} should escape"
            );
        }
    }

    #[test]
    fn test_inside_paths_join_lexically() {
        let r = resolver();
        let resolved = r.resolve("/docs//reports/./2024/../2025/").unwrap();
        assert_eq!(resolved.logical(), "/docs/reports/2025");
        assert_eq!(resolved.real(), Path::new("/srv/uploads/docs/reports/2025"));

        let resolved = r.resolve("docs/../notes").unwrap();
        assert_eq!(resolved.logical(), "/notes");
        assert_eq!(resolved.file_name(), Some("notes"));
    }

    #[test]
    fn test_nul_byte_is_malformed() {
        assert!(matches!(
            resolver().resolve("/docs/a\0b"),
            Err(PathError::Malformed(_))
        ));
    }

    #[test]
    fn test_dotted_names_are_not_traversal() {
        let resolved = resolver().resolve("/...").unwrap();
        assert_eq!(resolved.logical(), "/...");
        let resolved = resolver().resolve("/..hidden").unwrap();
        assert_eq!(resolved.real(), Path::new("/srv/uploads/..hidden"));
    }

    #[test]
    fn test_resolve_child_checks_the_joined_path() {
        let r = resolver();
        let docs = r.resolve("/docs").unwrap();
        let child = r.resolve_child(&docs, "a.txt").unwrap();
        assert_eq!(child.logical(), "/docs/a.txt");

        let root = r.resolve("/").unwrap();
        assert!(r.resolve_child(&root, "../x").is_err());
        // Climbing within the root is allowed
        let sibling = r.resolve_child(&docs, "../b.txt").unwrap();
        assert_eq!(sibling.logical(), "/b.txt");
    }

    #[test]
    fn test_join_logical() {
        assert_eq!(join_logical("/", "a"), "/a");
        assert_eq!(join_logical("/docs/", "a"), "/docs/a");
        assert_eq!(join_logical("", "a"), "/a");
    }
}
