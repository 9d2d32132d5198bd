use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use crate::application::data::{CaseMode, LogLevel};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Probe paths through an in-memory file system snapshot")]
pub struct Cli {
    /// Paths to probe, relative to the root. Added to the paths listed in fsnap.yaml
    pub paths: Vec<String>,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// The root directory of the project
    #[clap(long, short, default_value = ".")]
    pub root: PathBuf,

    /// Overrides caseSensitivity from fsnap.yaml
    #[clap(long, short, value_enum)]
    pub case_sensitivity: Option<CaseMode>,

    /// Record full listings of probed directories
    #[clap(long)]
    pub list_directories: bool,

    /// Abort on the first path that cannot be probed instead of reporting it as unknown
    #[clap(long)]
    pub fail_fast: bool,

    /// How many times the paths are resolved
    #[clap(long, short, default_value = "2")]
    pub passes: NonZeroUsize,
}
