//! Destination path helpers for extraction.

use crate::ArchiveError;
use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Resolves an archive entry path under `root`.
///
/// # Errors
///
/// Returns [`ArchiveError::PathTraversal`] if the entry path is absolute,
/// carries a drive prefix, contains `..` or is empty.
///
/// # Examples
///
/// ```
/// use hammer_core::paths::safe_join;
/// use std::path::Path;
///
/// let root = Path::new("/out");
/// assert_eq!(safe_join(root, "a/b.txt").unwrap(), Path::new("/out/a/b.txt"));
/// assert!(safe_join(root, "../escape").is_err());
/// assert!(safe_join(root, "/etc/passwd").is_err());
/// ```
pub fn safe_join(root: &Path, entry_path: &str) -> Result<PathBuf> {
    let relative = Path::new(entry_path);
    let traversal = || ArchiveError::PathTraversal {
        path: relative.to_path_buf(),
    };

    let mut joined = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(traversal());
            }
        }
    }

    if depth == 0 {
        return Err(traversal());
    }
    Ok(joined)
}

/// Returns the first free `name (n).ext` sibling of `path`.
///
/// # Examples
///
/// ```no_run
/// use hammer_core::paths::unique_path;
/// use std::path::Path;
///
/// // With "report.pdf" already present:
/// assert_eq!(unique_path(Path::new("report.pdf")), Path::new("report (1).pdf"));
/// ```
#[must_use]
pub fn unique_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| path.with_file_name(format!("{stem} ({n}){extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Folder name used when extracting into a per-archive subfolder.
///
/// Strips every archive suffix, so `backup.tar.gz` gives `backup`.
#[must_use]
pub fn archive_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let lower = name.to_ascii_lowercase();
    let longest = crate::formats::supported_formats()
        .iter()
        .flat_map(|info| info.extensions.iter())
        .filter(|ext| lower.ends_with(*ext))
        .map(|ext| ext.len())
        .max()
        .unwrap_or(0);

    let stem = &name[..name.len() - longest];
    if stem.is_empty() {
        "extracted".to_string()
    } else {
        stem.to_string()
    }
}
