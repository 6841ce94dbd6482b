//! Format-polymorphic archive engine.
//!
//! `hammer-core` lists, extracts, creates, tests and edits archives (ZIP,
//! 7z, tar with or without gzip/bzip2/xz/zstd, and single-stream
//! compressed files) through one reader/writer contract. Entry data is
//! streamed, never loaded whole; every operation reports progress, honors
//! cooperative cancellation and returns exactly one [`OperationResult`].
//!
//! Adding or deleting entries rebuilds the archive in a temporary file next
//! to it and swaps the result in, so a failed edit leaves the original
//! untouched.
//!
//! # Examples
//!
//! ```no_run
//! use hammer_core::ArchiveEngine;
//! use hammer_core::CompressionConfig;
//! use hammer_core::ExtractOptions;
//! use hammer_core::formats::ArchiveFormat;
//!
//! let engine = ArchiveEngine::new();
//!
//! let result = engine
//!     .compress(
//!         vec!["notes".into()],
//!         "notes.zip",
//!         ArchiveFormat::Zip,
//!         CompressionConfig::default(),
//!     )
//!     .join();
//! assert!(result.success, "{}", result.message);
//!
//! let result = engine
//!     .extract("notes.zip", "restored", ExtractOptions::new())
//!     .join();
//! println!("extracted {} files", result.processed.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod config;
pub mod copy;
pub mod engine;
pub mod error;
pub mod formats;
pub mod operations;
pub mod paths;
pub mod progress;
pub mod rebuild;
pub mod report;
pub mod types;
pub mod walker;

#[cfg(test)]
mod test_utils;

// Re-export main API types
pub use cancel::CancellationToken;
pub use config::CompressionConfig;
pub use config::ExtractOptions;
pub use config::ExtractionConfig;
pub use config::OverwritePolicy;
pub use config::PathAnchor;
pub use engine::ArchiveEngine;
pub use engine::OperationHandle;
pub use error::ArchiveError;
pub use error::Result;
pub use formats::ArchiveFormat;
pub use operations::OperationContext;
pub use progress::OperationKind;
pub use progress::OperationProgress;
pub use progress::ProgressSink;
pub use report::OperationResult;
pub use report::Outcome;
pub use types::ArchiveEntry;
pub use types::ArchiveMetadata;
pub use types::EntryLink;
