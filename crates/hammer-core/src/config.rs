//! Read-only configuration snapshots for operations.
//!
//! Operations clone the configuration they are given when they start, so
//! callers may keep editing their copy while work is in flight.

use crate::ArchiveError;
use crate::Result;

/// Default compression level on the engine's 0-9 scale.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 5;

/// How archive-relative paths are derived from source paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathAnchor {
    /// Each file is relative to the parent of the source path that
    /// produced it, so `a/b.txt` from source `a` is stored as `a/b.txt`.
    #[default]
    EachSource,
    /// Every file is relative to the parent of the first source path.
    /// Files outside that directory fall back to their file name.
    FirstSource,
}

/// Configuration for compress and add operations.
///
/// # Examples
///
/// ```
/// use hammer_core::CompressionConfig;
///
/// let config = CompressionConfig::default()
///     .with_compression_level(9)
///     .with_password("s3cret");
/// assert!(config.validate().is_ok());
///
/// let bad = CompressionConfig::default().with_compression_level(12);
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Codec effort, 0 (store) to 9 (best).
    ///
    /// Default: 5.
    pub compression_level: u8,

    /// Compress entries as one stream.
    ///
    /// Default: `false`.
    pub create_solid_archive: bool,

    /// Volume size in bytes, 0 disables splitting.
    ///
    /// Default: 0.
    pub split_volume_size: u64,

    /// Hide entry names under the password.
    ///
    /// Default: `false`.
    pub encrypt_file_names: bool,

    /// Password used when the caller supplies none.
    ///
    /// Default: `None`.
    pub default_password: Option<String>,

    /// Store archive-relative paths instead of absolute ones.
    ///
    /// Default: `true`.
    pub store_relative_paths: bool,

    /// Base used to compute archive-relative paths.
    ///
    /// Default: [`PathAnchor::EachSource`].
    pub path_anchor: PathAnchor,

    /// Remove the source paths after a fully successful compress.
    ///
    /// Default: `false`.
    pub delete_after_compression: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            create_solid_archive: false,
            split_volume_size: 0,
            encrypt_file_names: false,
            default_password: None,
            store_relative_paths: true,
            path_anchor: PathAnchor::EachSource,
            delete_after_compression: false,
        }
    }
}

impl CompressionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level. Checked by [`Self::validate`].
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets whether to build a solid archive.
    #[must_use]
    pub fn with_solid(mut self, solid: bool) -> Self {
        self.create_solid_archive = solid;
        self
    }

    /// Sets the split volume size.
    #[must_use]
    pub fn with_split_volume_size(mut self, size: u64) -> Self {
        self.split_volume_size = size;
        self
    }

    /// Sets whether entry names should be encrypted.
    #[must_use]
    pub fn with_encrypt_file_names(mut self, encrypt: bool) -> Self {
        self.encrypt_file_names = encrypt;
        self
    }

    /// Sets the default password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.default_password = Some(password.into());
        self
    }

    /// Sets whether relative paths are stored.
    #[must_use]
    pub fn with_store_relative_paths(mut self, relative: bool) -> Self {
        self.store_relative_paths = relative;
        self
    }

    /// Sets the path anchoring rule.
    #[must_use]
    pub fn with_path_anchor(mut self, anchor: PathAnchor) -> Self {
        self.path_anchor = anchor;
        self
    }

    /// Sets whether sources are removed after compression.
    #[must_use]
    pub fn with_delete_after_compression(mut self, delete: bool) -> Self {
        self.delete_after_compression = delete;
        self
    }

    /// Returns the password, ignoring empty strings.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.default_password.as_deref().filter(|p| !p.is_empty())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Compression level is not in range 0-9
    /// - File name encryption is requested without a password
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(ArchiveError::InvalidCompressionLevel {
                level: self.compression_level,
            });
        }
        if self.encrypt_file_names && self.password().is_none() {
            return Err(ArchiveError::InvalidConfig {
                reason: "encrypting file names requires a password".into(),
            });
        }
        Ok(())
    }
}

/// What to do when an extracted file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Leave the existing file and record a warning.
    SkipExisting,
    /// Write next to it as `name (1).ext`, `name (2).ext`, ...
    KeepBoth,
}

/// Configuration for extract operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Apply entry modification times to extracted files.
    ///
    /// Default: `true`.
    pub preserve_timestamps: bool,

    /// Existing file handling.
    ///
    /// Default: [`OverwritePolicy::Overwrite`].
    pub overwrite: OverwritePolicy,

    /// Extract into a subfolder named after the archive.
    ///
    /// Default: `false`.
    pub create_subfolder: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            preserve_timestamps: true,
            overwrite: OverwritePolicy::Overwrite,
            create_subfolder: false,
        }
    }
}

impl ExtractionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether timestamps are preserved.
    #[must_use]
    pub fn with_preserve_timestamps(mut self, preserve: bool) -> Self {
        self.preserve_timestamps = preserve;
        self
    }

    /// Sets the overwrite policy.
    #[must_use]
    pub fn with_overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Sets whether to extract into a subfolder.
    #[must_use]
    pub fn with_create_subfolder(mut self, subfolder: bool) -> Self {
        self.create_subfolder = subfolder;
        self
    }
}

/// Inputs of an extract request besides the paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Password for encrypted archives.
    pub password: Option<String>,
    /// Entry paths to extract; `None` extracts every file.
    pub selection: Option<Vec<String>>,
    /// Extraction behavior.
    pub config: ExtractionConfig,
}

impl ExtractOptions {
    /// Creates options that extract everything with default behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Restricts extraction to the given entry paths.
    #[must_use]
    pub fn with_selection<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the extraction behavior.
    #[must_use]
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_config_default() {
        let config = CompressionConfig::default();
        assert_eq!(config.compression_level, 5);
        assert!(!config.create_solid_archive);
        assert_eq!(config.split_volume_size, 0);
        assert!(!config.encrypt_file_names);
        assert_eq!(config.default_password, None);
        assert!(config.store_relative_paths);
        assert_eq!(config.path_anchor, PathAnchor::EachSource);
        assert!(!config.delete_after_compression);
    }

    #[test]
    fn test_compression_config_builder() {
        let config = CompressionConfig::new()
            .with_compression_level(0)
            .with_solid(true)
            .with_split_volume_size(1024)
            .with_password("pw")
            .with_encrypt_file_names(true)
            .with_store_relative_paths(false)
            .with_path_anchor(PathAnchor::FirstSource)
            .with_delete_after_compression(true);

        assert_eq!(config.compression_level, 0);
        assert!(config.create_solid_archive);
        assert_eq!(config.split_volume_size, 1024);
        assert_eq!(config.password(), Some("pw"));
        assert!(config.encrypt_file_names);
        assert!(!config.store_relative_paths);
        assert_eq!(config.path_anchor, PathAnchor::FirstSource);
        assert!(config.delete_after_compression);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_level_range() {
        for level in 0..=9 {
            assert!(
                CompressionConfig::default()
                    .with_compression_level(level)
                    .validate()
                    .is_ok()
            );
        }

        let result = CompressionConfig::default()
            .with_compression_level(10)
            .validate();
        assert!(matches!(
            result.unwrap_err(),
            ArchiveError::InvalidCompressionLevel { level: 10 }
        ));
    }

    #[test]
    fn test_validate_name_encryption_needs_password() {
        let config = CompressionConfig::default().with_encrypt_file_names(true);
        assert!(matches!(
            config.validate(),
            Err(ArchiveError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_empty_password_is_none() {
        let config = CompressionConfig::default().with_password("");
        assert_eq!(config.password(), None);
    }

    #[test]
    fn test_extraction_config_builder() {
        let config = ExtractionConfig::new()
            .with_preserve_timestamps(false)
            .with_overwrite(OverwritePolicy::KeepBoth)
            .with_create_subfolder(true);
        assert!(!config.preserve_timestamps);
        assert_eq!(config.overwrite, OverwritePolicy::KeepBoth);
        assert!(config.create_subfolder);
    }

    #[test]
    fn test_extract_options_builder() {
        let options = ExtractOptions::new()
            .with_password("pw")
            .with_selection(["a.txt", "dir/b.txt"]);
        assert_eq!(options.password.as_deref(), Some("pw"));
        assert_eq!(
            options.selection.unwrap(),
            vec!["a.txt".to_string(), "dir/b.txt".to_string()]
        );
        assert_eq!(options.config, ExtractionConfig::default());
    }
}
