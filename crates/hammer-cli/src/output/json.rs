//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::capability_names;
use super::formatter::outcome_name;
use super::formatter::unix_seconds;
use anyhow::Result;
use hammer_core::ArchiveEntry;
use hammer_core::ArchiveMetadata;
use hammer_core::EntryLink;
use hammer_core::OperationResult;
use hammer_core::formats::FormatInfo;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ResultOutput<'a> {
    outcome: &'static str,
    message: &'a str,
    processed: &'a [String],
    errors: &'a [String],
    warnings: &'a [String],
    duration_ms: u128,
}

#[derive(Serialize)]
struct EntryOutput<'a> {
    path: &'a str,
    size: u64,
    compressed_size: u64,
    compression_ratio: f64,
    is_directory: bool,
    is_encrypted: bool,
    compression_method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<&'a str>,
}

impl<'a> From<&'a ArchiveEntry> for EntryOutput<'a> {
    fn from(entry: &'a ArchiveEntry) -> Self {
        Self {
            path: &entry.path,
            size: entry.size,
            compressed_size: entry.compressed_size,
            compression_ratio: entry.compression_ratio(),
            is_directory: entry.is_directory,
            is_encrypted: entry.is_encrypted,
            compression_method: &entry.compression_method,
            modified: unix_seconds(entry.modified),
            link_target: entry.link.as_ref().map(EntryLink::target),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_result(&self, result: &OperationResult) -> Result<()> {
        let data = ResultOutput {
            outcome: outcome_name(result.outcome),
            message: &result.message,
            processed: &result.processed,
            errors: &result.errors,
            warnings: &result.warnings,
            duration_ms: result.duration.as_millis(),
        };

        let operation = result.operation.to_string();
        if result.success {
            Self::output(&JsonOutput::success(operation, data))
        } else {
            let error = result
                .error
                .as_ref()
                .map_or_else(|| result.message.clone(), ToString::to_string);
            Self::output(&JsonOutput::failure(operation, data, error))
        }
    }

    fn format_entries(
        &self,
        entries: &[ArchiveEntry],
        _long: bool,
        _human_readable: bool,
    ) -> Result<()> {
        let data: Vec<EntryOutput<'_>> = entries.iter().map(EntryOutput::from).collect();
        Self::output(&JsonOutput::success("list", data))
    }

    fn format_metadata(&self, metadata: &ArchiveMetadata) -> Result<()> {
        #[derive(Serialize)]
        struct MetadataOutput {
            path: String,
            format: String,
            entry_count: usize,
            total_size: u64,
            total_compressed_size: u64,
            compression_ratio: f64,
            is_encrypted: bool,
            is_solid: bool,
            is_multi_volume: bool,
            comment: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            created: Option<u64>,
        }

        let data = MetadataOutput {
            path: metadata.path.display().to_string(),
            format: metadata.format.to_string(),
            entry_count: metadata.entry_count,
            total_size: metadata.total_size,
            total_compressed_size: metadata.total_compressed_size,
            compression_ratio: metadata.compression_ratio(),
            is_encrypted: metadata.is_encrypted,
            is_solid: metadata.is_solid,
            is_multi_volume: metadata.is_multi_volume,
            comment: metadata.comment.clone(),
            created: unix_seconds(metadata.created),
        };

        Self::output(&JsonOutput::success("info", data))
    }

    fn format_formats(&self, formats: &[FormatInfo]) -> Result<()> {
        #[derive(Serialize)]
        struct FormatOutput {
            name: &'static str,
            description: &'static str,
            extensions: &'static [&'static str],
            mime_type: &'static str,
            capabilities: Vec<&'static str>,
        }

        let data: Vec<FormatOutput> = formats
            .iter()
            .map(|info| FormatOutput {
                name: info.name,
                description: info.description,
                extensions: info.extensions,
                mime_type: info.mime_type,
                capabilities: capability_names(info.capabilities),
            })
            .collect();

        Self::output(&JsonOutput::success("formats", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        // stdout carries at most one document; errors go to stderr
        let output = JsonOutput::<()>::error("unknown", format!("{error:#}"));
        if let Ok(json) = serde_json::to_string(&output) {
            let _ = writeln!(io::stderr(), "{json}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_output_fields() {
        let mut entry = ArchiveEntry::new("docs/a.txt", false);
        entry.size = 200;
        entry.compressed_size = 50;

        let json = serde_json::to_value(EntryOutput::from(&entry)).unwrap();
        assert_eq!(json["path"], "docs/a.txt");
        assert_eq!(json["size"], 200);
        assert_eq!(json["compression_ratio"], 75.0);
        assert!(json.get("modified").is_none());
        assert!(json.get("link_target").is_none());

        let mut link = ArchiveEntry::new("current", false);
        link.link = Some(EntryLink::Symbolic("v2".into()));
        let json = serde_json::to_value(EntryOutput::from(&link)).unwrap();
        assert_eq!(json["link_target"], "v2");
    }
}
