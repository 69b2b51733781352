use clap::Parser;
use std::path::PathBuf;

use crate::hashfs::ReaderOptions;

#[derive(Parser, Debug)]
#[command(name = "hashfs")]
#[command(version)]
#[command(about = "Inspect and extract SCS HashFS archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  hashfs base.scs /def -d out      extract the /def tree of base.scs into out\n  \
  hashfs -p def.scs /manifest.sii  print a single file to stdout\n  \
  hashfs -l base.scs /map          list the /map directory\n  \
  hashfs --hash base.scs /def      print the lookup hash of /def")]
pub struct Cli {
    /// HashFS archive (.scs)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Archive paths to operate on (default: /)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// List a directory (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List a directory verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<PathBuf>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Print the lookup hash of each path instead of extracting
    #[arg(long)]
    pub hash: bool,

    /// Salt used with --hash instead of the archive's own
    #[arg(long, value_name = "SALT", requires = "hash")]
    pub salt: Option<u16>,

    /// Read the v1 entry table from the end of the file
    #[arg(long)]
    pub table_at_end: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Paths given on the command line, or the root.
    pub fn targets(&self) -> Vec<String> {
        if self.paths.is_empty() {
            vec!["/".to_string()]
        } else {
            self.paths.clone()
        }
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            force_entry_table_at_end: self.table_at_end,
        }
    }
}
