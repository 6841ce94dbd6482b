//! Info command implementation

use crate::cli::InfoArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use hammer_core::operations::open_archive;

pub fn execute(args: &InfoArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let metadata = add_archive_context(
        open_archive(&args.archive, args.password.as_deref()),
        &args.archive,
    )?;

    formatter.format_metadata(&metadata)
}
