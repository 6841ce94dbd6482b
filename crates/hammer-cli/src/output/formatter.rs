//! Output formatter trait for CLI results.

use anyhow::Result;
use hammer_core::ArchiveEntry;
use hammer_core::ArchiveMetadata;
use hammer_core::OperationResult;
use hammer_core::Outcome;
use hammer_core::formats::FormatCapabilities;
use hammer_core::formats::FormatInfo;
use serde::Serialize;
use std::time::SystemTime;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the result of a background operation
    fn format_result(&self, result: &OperationResult) -> Result<()>;

    /// Format an entry listing
    fn format_entries(
        &self,
        entries: &[ArchiveEntry],
        long: bool,
        human_readable: bool,
    ) -> Result<()>;

    /// Format an archive summary
    fn format_metadata(&self, metadata: &ArchiveMetadata) -> Result<()>;

    /// Format the format registry
    fn format_formats(&self, formats: &[FormatInfo]) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: Some(data),
            error: Some(error.into()),
        }
    }

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Stable lowercase name of an outcome.
pub const fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Completed => "completed",
        Outcome::CompletedWithErrors => "completed_with_errors",
        Outcome::Cancelled => "cancelled",
        Outcome::Failed => "failed",
    }
}

/// Capability names in registry order.
pub fn capability_names(capabilities: FormatCapabilities) -> Vec<&'static str> {
    [
        (capabilities.can_read(), "read"),
        (capabilities.can_write(), "write"),
        (capabilities.can_test(), "test"),
        (capabilities.can_encrypt(), "encrypt"),
        (capabilities.can_multi_volume(), "multi-volume"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

/// Seconds since the Unix epoch, if the time is after it.
pub fn unix_seconds(time: Option<SystemTime>) -> Option<u64> {
    time.and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hammer_core::ArchiveFormat;
    use std::time::Duration;

    #[test]
    fn test_capability_names() {
        let zip = ArchiveFormat::Zip.capabilities();
        assert_eq!(capability_names(zip), ["read", "write", "test", "encrypt"]);
        assert!(capability_names(ArchiveFormat::Cab.capabilities()).is_empty());
    }

    #[test]
    fn test_unix_seconds() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        assert_eq!(unix_seconds(Some(t)), Some(42));
        assert_eq!(unix_seconds(None), None);
    }

    #[test]
    fn test_json_output_skips_empty_fields() {
        let json = serde_json::to_string(&JsonOutput::success("list", 3)).unwrap();
        assert_eq!(json, r#"{"operation":"list","status":"success","data":3}"#);
    }
}
