//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::capability_names;
use anyhow::Result;
use console::Term;
use console::style;
use hammer_core::ArchiveEntry;
use hammer_core::ArchiveMetadata;
use hammer_core::OperationKind;
use hammer_core::OperationResult;
use hammer_core::Outcome;
use hammer_core::formats::FormatInfo;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let digits = n.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        grouped
    }

    const fn processed_label(operation: OperationKind) -> &'static str {
        match operation {
            OperationKind::Extract => "Files extracted",
            OperationKind::Compress | OperationKind::Add => "Files added",
            OperationKind::Test => "Entries tested",
            OperationKind::Delete => "Entries removed",
        }
    }

    fn write_headline(&self, result: &OperationResult) {
        let line = if self.use_colors {
            let mark = match result.outcome {
                Outcome::Completed => style("✓").green().bold(),
                Outcome::CompletedWithErrors | Outcome::Cancelled => style("⚠").yellow().bold(),
                Outcome::Failed => style("✗").red().bold(),
            };
            format!("{mark} {}", result.message)
        } else {
            result.message.clone()
        };
        let _ = self.term.write_line(&line);
    }

    fn write_section(&self, title: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        let _ = self.term.write_line("");
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{}", style(title).yellow().bold()));
        } else {
            let _ = self.term.write_line(title);
        }
        for item in items {
            let _ = self.term.write_line(&format!("  - {item}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_result(&self, result: &OperationResult) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_headline(result);

        if result.outcome != Outcome::Failed {
            let _ = self.term.write_line(&format!(
                "  {}: {}",
                Self::processed_label(result.operation),
                Self::format_number(result.processed.len())
            ));
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", result.duration));
            for item in &result.processed {
                let _ = self.term.write_line(&format!("    {item}"));
            }
        }

        self.write_section("Errors:", &result.errors);
        self.write_section("Warnings:", &result.warnings);

        Ok(())
    }

    fn format_entries(
        &self,
        entries: &[ArchiveEntry],
        long: bool,
        human_readable: bool,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if !long {
            for entry in entries {
                let _ = self.term.write_line(&entry.path);
            }
            return Ok(());
        }

        let size = |bytes: u64| {
            if human_readable {
                Self::format_size(bytes)
            } else {
                bytes.to_string()
            }
        };

        let mut total_size = 0;
        let mut files = 0;
        for entry in entries {
            let type_char = if entry.is_directory {
                "d"
            } else if entry.is_link() {
                "l"
            } else {
                "-"
            };
            let lock = if entry.is_encrypted { "*" } else { " " };
            let target = entry
                .link
                .as_ref()
                .map(|link| format!(" -> {}", link.target()))
                .unwrap_or_default();
            let _ = self.term.write_line(&format!(
                "{type_char}{lock} {:>10} {:>10} {:>5.1}% {:<8} {}{target}",
                size(entry.size),
                size(entry.compressed_size),
                entry.compression_ratio(),
                entry.compression_method,
                entry.path
            ));
            if !entry.is_directory && !entry.is_link() {
                files += 1;
                total_size += entry.size;
            }
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} files, {}",
            Self::format_number(files),
            Self::format_size(total_size)
        ));

        Ok(())
    }

    fn format_metadata(&self, metadata: &ArchiveMetadata) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        let lines = [
            format!("Archive:          {}", metadata.path.display()),
            format!("Format:           {}", metadata.format),
            format!(
                "Files:            {}",
                Self::format_number(metadata.entry_count)
            ),
            format!(
                "Total size:       {}",
                Self::format_size(metadata.total_size)
            ),
            format!(
                "Compressed size:  {}",
                Self::format_size(metadata.total_compressed_size)
            ),
            format!("Compression:      {:.1}%", metadata.compression_ratio()),
            format!("Encrypted:        {}", yes_no(metadata.is_encrypted)),
            format!("Solid:            {}", yes_no(metadata.is_solid)),
            format!("Multi-volume:     {}", yes_no(metadata.is_multi_volume)),
        ];
        for line in &lines {
            let _ = self.term.write_line(line);
        }
        if !metadata.comment.is_empty() {
            let _ = self
                .term
                .write_line(&format!("Comment:          {}", metadata.comment));
        }

        Ok(())
    }

    fn format_formats(&self, formats: &[FormatInfo]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for info in formats {
            let capabilities = capability_names(info.capabilities);
            let capabilities = if capabilities.is_empty() {
                "detect only".to_string()
            } else {
                capabilities.join(", ")
            };
            let name = if self.use_colors {
                style(format!("{:<8}", info.name)).bold().to_string()
            } else {
                format!("{:<8}", info.name)
            };
            let _ = self.term.write_line(&format!(
                "{name} {:<22} {capabilities}",
                info.extensions.join(" ")
            ));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("ERROR: {error:?}"));
        }
    }
}
