//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_complete::Shell;
use hammer_core::ArchiveFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hammer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract archive contents
    Extract(ExtractArgs),
    /// Create a new archive
    Compress(CompressArgs),
    /// List archive contents without extraction
    List(ListArgs),
    /// Show archive summary
    Info(InfoArgs),
    /// Test archive integrity
    Test(TestArgs),
    /// Add files to an existing archive
    Add(AddArgs),
    /// Delete entries from an existing archive
    Delete(DeleteArgs),
    /// List known formats and their capabilities
    Formats,
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Password for encrypted archives
    #[arg(short, long)]
    pub password: Option<String>,

    /// Extract only these entries (directories include their contents)
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub only: Vec<String>,

    /// Leave existing files untouched
    #[arg(long, conflicts_with = "keep_both")]
    pub skip_existing: bool,

    /// Write next to existing files as "name (1).ext"
    #[arg(long)]
    pub keep_both: bool,

    /// Extract into a folder named after the archive
    #[arg(long)]
    pub subfolder: bool,

    /// Do not restore modification times
    #[arg(long)]
    pub no_timestamps: bool,
}

#[derive(clap::Args)]
pub struct CompressArgs {
    /// Output archive file path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Source files or directories to archive
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Archive format (default: detected from OUTPUT)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Compression level (0-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub level: Option<u8>,

    /// Encrypt entries with this password (ZIP only)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Anchor every entry path at the first source's parent
    #[arg(long)]
    pub first_source_anchor: bool,

    /// Store absolute source paths (without root) instead of relative ones
    #[arg(long)]
    pub absolute_paths: bool,

    /// Remove the sources after a fully successful compression
    #[arg(long)]
    pub delete_sources: bool,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Password for encrypted archives
    #[arg(short, long)]
    pub password: Option<String>,

    /// Show detailed entry information
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,
}

#[derive(clap::Args)]
pub struct InfoArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Password for encrypted archives
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct TestArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Password for encrypted archives
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct AddArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Files or directories to add
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Compression level (0-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub level: Option<u8>,

    /// Archive password
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Entry paths to remove (directories remove their contents)
    #[arg(value_name = "ENTRY", required = true)]
    pub entries: Vec<String>,

    /// Archive password
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Writable formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Zip,
    #[value(name = "7z")]
    SevenZip,
    Tar,
    #[value(name = "tar.gz", alias = "tgz")]
    TarGz,
    #[value(name = "tar.bz2", alias = "tbz2")]
    TarBz2,
    #[value(name = "tar.xz", alias = "txz")]
    TarXz,
    #[value(name = "tar.zst", alias = "tzst")]
    TarZst,
    Gz,
    Bz2,
    Xz,
    Zst,
}

impl From<FormatArg> for ArchiveFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Zip => Self::Zip,
            FormatArg::SevenZip => Self::SevenZip,
            FormatArg::Tar => Self::Tar,
            FormatArg::TarGz => Self::TarGz,
            FormatArg::TarBz2 => Self::TarBz2,
            FormatArg::TarXz => Self::TarXz,
            FormatArg::TarZst => Self::TarZst,
            FormatArg::Gz => Self::GZip,
            FormatArg::Bz2 => Self::BZip2,
            FormatArg::Xz => Self::Xz,
            FormatArg::Zst => Self::Zstd,
        }
    }
}
