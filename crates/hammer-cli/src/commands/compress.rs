//! Compress command implementation.

use super::run;
use crate::cli::CompressArgs;
use crate::output::OutputFormatter;
use anyhow::Result;
use hammer_core::ArchiveFormat;
use hammer_core::CompressionConfig;
use hammer_core::PathAnchor;
use hammer_core::formats::detect_format;

pub fn execute(
    args: &CompressArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let format = target_format(args);
    let config = compression_config(args);
    let sources = args.sources.clone();
    let output = args.output.clone();
    run(formatter, show_progress, move |engine| {
        engine.compress(sources, output, format, config)
    })
}

/// Explicit `--format`, otherwise whatever the output name implies.
fn target_format(args: &CompressArgs) -> ArchiveFormat {
    args.format
        .map_or_else(|| detect_format(&args.output), ArchiveFormat::from)
}

fn compression_config(args: &CompressArgs) -> CompressionConfig {
    let mut config = CompressionConfig::new()
        .with_store_relative_paths(!args.absolute_paths)
        .with_delete_after_compression(args.delete_sources);
    if let Some(level) = args.level {
        config = config.with_compression_level(level);
    }
    if let Some(password) = &args.password {
        config = config.with_password(password.clone());
    }
    if args.first_source_anchor {
        config = config.with_path_anchor(PathAnchor::FirstSource);
    }
    config
}
