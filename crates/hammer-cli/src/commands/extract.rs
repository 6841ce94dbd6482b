//! Extract command implementation.

use super::run;
use crate::cli::ExtractArgs;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use hammer_core::ExtractOptions;
use hammer_core::ExtractionConfig;
use hammer_core::OverwritePolicy;
use std::env;

pub fn execute(
    args: &ExtractArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let options = extract_options(args);
    let archive = args.archive.clone();
    run(formatter, show_progress, move |engine| {
        engine.extract(archive, output_dir, options)
    })
}

fn extract_options(args: &ExtractArgs) -> ExtractOptions {
    let overwrite = if args.skip_existing {
        OverwritePolicy::SkipExisting
    } else if args.keep_both {
        OverwritePolicy::KeepBoth
    } else {
        OverwritePolicy::Overwrite
    };

    let config = ExtractionConfig::new()
        .with_preserve_timestamps(!args.no_timestamps)
        .with_overwrite(overwrite)
        .with_create_subfolder(args.subfolder);

    let mut options = ExtractOptions::new().with_config(config);
    if let Some(password) = &args.password {
        options = options.with_password(password.clone());
    }
    if !args.only.is_empty() {
        options = options.with_selection(args.only.iter().cloned());
    }
    options
}
