//! Test command implementation

use super::run;
use crate::cli::TestArgs;
use crate::output::OutputFormatter;
use anyhow::Result;

pub fn execute(
    args: &TestArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let archive = args.archive.clone();
    let password = args.password.clone();
    run(formatter, show_progress, move |engine| {
        engine.test(archive, password)
    })
}
