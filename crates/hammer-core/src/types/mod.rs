//! Data model returned by the engine.
//!
//! Every value here is an owned snapshot. The engine builds fresh values on
//! each call and never mutates them after returning.

pub mod entry;
pub mod metadata;

pub use entry::ArchiveEntry;
pub use entry::EntryLink;
pub use entry::normalize_entry_path;
pub use metadata::ArchiveMetadata;
