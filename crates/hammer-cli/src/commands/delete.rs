//! Delete command implementation

use super::run;
use crate::cli::DeleteArgs;
use crate::output::OutputFormatter;
use anyhow::Result;
use hammer_core::CompressionConfig;

pub fn execute(
    args: &DeleteArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let mut config = CompressionConfig::new();
    if let Some(password) = &args.password {
        config = config.with_password(password.clone());
    }

    let archive = args.archive.clone();
    let entries = args.entries.clone();
    run(formatter, show_progress, move |engine| {
        engine.delete(archive, entries, config)
    })
}
