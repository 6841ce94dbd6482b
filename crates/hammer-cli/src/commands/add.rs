//! Add command implementation

use super::run;
use crate::cli::AddArgs;
use crate::output::OutputFormatter;
use anyhow::Result;
use hammer_core::CompressionConfig;

pub fn execute(
    args: &AddArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let mut config = CompressionConfig::new();
    if let Some(level) = args.level {
        config = config.with_compression_level(level);
    }
    if let Some(password) = &args.password {
        config = config.with_password(password.clone());
    }

    let archive = args.archive.clone();
    let sources = args.sources.clone();
    run(formatter, show_progress, move |engine| {
        engine.add(archive, sources, config)
    })
}
