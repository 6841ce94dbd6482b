//! Source flattening for compress and add.
//!
//! Turns the caller's source paths into an ordered list of regular files,
//! each paired with the archive path it will be stored under.

use crate::ArchiveError;
use crate::Result;
use crate::config::CompressionConfig;
use crate::config::PathAnchor;
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// A regular file scheduled for writing into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Filesystem path to read from.
    pub path: PathBuf,
    /// Archive path to store the file under.
    pub archive_path: String,
    /// Size at walk time.
    pub size: u64,
    /// Modification time at walk time.
    pub modified: Option<SystemTime>,
    /// Unix permission bits, where the platform has them.
    pub mode: Option<u32>,
}

/// Result of flattening a set of source paths.
#[derive(Debug, Default)]
pub struct SourceSet {
    /// Files in caller order, directories expanded in name order.
    pub files: Vec<SourceFile>,
    /// Items that could not be walked, with their cause.
    pub failures: Vec<(String, ArchiveError)>,
    /// Non-fatal notices (anchoring fallbacks, duplicates).
    pub warnings: Vec<String>,
}

impl SourceSet {
    /// Sum of all file sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Flattens `sources` into files with archive paths.
///
/// Directories are walked recursively, following symlinks. Files that
/// would land on an archive path already taken are skipped with a warning.
///
/// # Errors
///
/// Returns [`ArchiveError::NotFound`] if any source path does not exist;
/// nothing is walked in that case.
pub fn collect_sources(sources: &[PathBuf], config: &CompressionConfig) -> Result<SourceSet> {
    if let Some(missing) = sources.iter().find(|p| !p.exists()) {
        return Err(ArchiveError::NotFound {
            path: missing.clone(),
        });
    }

    let first_base = sources.first().map(|p| anchor_base(p));
    let mut set = SourceSet::default();
    let mut taken = HashSet::new();

    for source in sources {
        let base = match config.path_anchor {
            PathAnchor::EachSource => anchor_base(source),
            PathAnchor::FirstSource => first_base.clone().unwrap_or_default(),
        };

        for item in WalkDir::new(source).follow_links(true).sort_by_file_name() {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    let label = err
                        .path()
                        .unwrap_or(source)
                        .display()
                        .to_string();
                    set.failures.push((label, err.into()));
                    continue;
                }
            };
            if !item.file_type().is_file() {
                continue;
            }

            let path = item.path();
            let metadata = match item.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    set.failures.push((path.display().to_string(), err.into()));
                    continue;
                }
            };

            let archive_path = if config.store_relative_paths {
                relative_archive_path(path, &base).unwrap_or_else(|| {
                    set.warnings.push(format!(
                        "{}: outside {}, stored by file name",
                        path.display(),
                        base.display()
                    ));
                    file_name(path)
                })
            } else {
                absolute_archive_path(path)
            };

            if !taken.insert(archive_path.clone()) {
                set.warnings.push(format!(
                    "{}: archive path {archive_path} already used, skipped",
                    path.display()
                ));
                continue;
            }

            debug!(source = %path.display(), archive_path, "queued source file");
            set.files.push(SourceFile {
                path: path.to_path_buf(),
                archive_path,
                size: metadata.len(),
                modified: metadata.modified().ok(),
                mode: file_mode(&metadata),
            });
        }
    }

    Ok(set)
}

/// Directory a source's archive paths are relative to: its parent.
fn anchor_base(source: &Path) -> PathBuf {
    source.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn relative_archive_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let joined = join_normal(relative);
    (!joined.is_empty()).then_some(joined)
}

fn absolute_archive_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    join_normal(&absolute)
}

/// Joins the normal components of `path` with `/`, dropping roots,
/// prefixes and `.`.
fn join_normal(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| join_normal(path), |n| n.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_mode(_metadata: &Metadata) -> Option<u32> {
    None
}
