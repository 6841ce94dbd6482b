//! Formats command implementation

use crate::output::OutputFormatter;
use anyhow::Result;
use hammer_core::formats::supported_formats;

pub fn execute(formatter: &dyn OutputFormatter) -> Result<()> {
    formatter.format_formats(supported_formats())
}
