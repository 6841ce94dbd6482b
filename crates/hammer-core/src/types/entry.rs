//! Archive entry snapshot.

use std::time::SystemTime;

/// One file or directory inside an archive.
///
/// `path` always uses `/` as separator and never ends with one, whatever
/// convention the container used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-relative path, `/` separated.
    pub path: String,
    /// Last path segment.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Stored size in bytes.
    pub compressed_size: u64,
    /// Last modification time, if the container records one.
    pub modified: Option<SystemTime>,
    /// Entry is a directory.
    pub is_directory: bool,
    /// Entry data is encrypted.
    pub is_encrypted: bool,
    /// CRC-32 of the uncompressed data, 0 when unknown.
    pub crc32: u32,
    /// Compression method label, e.g. `Deflated` or `Stored`.
    pub compression_method: String,
    /// Unix mode bits, if the container records them.
    pub attributes: Option<u32>,
    /// Per-entry comment.
    pub comment: String,
    /// Link target, for symbolic and hard link entries.
    pub link: Option<EntryLink>,
}

/// Target of a link entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryLink {
    /// Symbolic link to a path, stored as written.
    Symbolic(String),
    /// Hard link to another entry of the same archive.
    Hard(String),
}

impl EntryLink {
    /// Path the link points at.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Symbolic(target) | Self::Hard(target) => target,
        }
    }
}

impl ArchiveEntry {
    /// Creates an entry from a raw container path.
    ///
    /// The path is normalized with [`normalize_entry_path`]. Sizes and
    /// metadata start empty.
    #[must_use]
    pub fn new(raw_path: &str, is_directory: bool) -> Self {
        let path = normalize_entry_path(raw_path);
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            path,
            name,
            size: 0,
            compressed_size: 0,
            modified: None,
            is_directory,
            is_encrypted: false,
            crc32: 0,
            compression_method: String::new(),
            attributes: None,
            comment: String::new(),
            link: None,
        }
    }

    /// Returns `true` for symbolic and hard link entries.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        self.link.is_some()
    }

    /// Compression ratio in percent.
    ///
    /// Returns `(1 - compressed_size / size) * 100`, or 0 for empty entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use hammer_core::ArchiveEntry;
    ///
    /// let mut entry = ArchiveEntry::new("a.txt", false);
    /// assert_eq!(entry.compression_ratio(), 0.0);
    ///
    /// entry.size = 200;
    /// entry.compressed_size = 50;
    /// assert_eq!(entry.compression_ratio(), 75.0);
    /// ```
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_size as f64 / self.size as f64) * 100.0
    }

    /// Parent directory of the entry, empty for top-level entries.
    #[must_use]
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Returns `true` if `self` is `target` or lies underneath it.
    #[must_use]
    pub fn is_within(&self, target: &str) -> bool {
        let target = normalize_entry_path(target);
        self.path == target
            || (!target.is_empty()
                && self.path.len() > target.len()
                && self.path.starts_with(&target)
                && self.path.as_bytes()[target.len()] == b'/')
    }
}

/// Normalizes a container path to the canonical `/` separated form.
///
/// Backslashes become `/`, empty and `.` segments are dropped and trailing
/// separators are removed. A leading `/` and `..` segments are kept so that
/// extraction can reject them.
///
/// # Examples
///
/// ```
/// use hammer_core::types::normalize_entry_path;
///
/// assert_eq!(normalize_entry_path(r"dir\sub\file.txt"), "dir/sub/file.txt");
/// assert_eq!(normalize_entry_path("./dir//file/"), "dir/file");
/// assert_eq!(normalize_entry_path("/etc/passwd"), "/etc/passwd");
/// ```
#[must_use]
pub fn normalize_entry_path(raw: &str) -> String {
    let replaced = raw.replace('\\', "/");
    let absolute = replaced.starts_with('/');
    let joined = replaced
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");

    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
