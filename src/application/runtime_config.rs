use std::num::NonZeroUsize;
use std::path::PathBuf;

use fsnap::snapshot::{CaseSensitivity, PathParseError, RelativePath};

use crate::application::data::CaseMode;
use crate::cli::Cli;
use crate::config::probe_config::ProbeConfig;

/// Settings of one run: the CLI wins over fsnap.yaml, path lists are combined.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub case_sensitivity: CaseSensitivity,
    pub list_directories: bool,
    /// A path that cannot be probed fails the run instead of being reported as unknown.
    pub fail_fast: bool,
    pub passes: NonZeroUsize,
    pub paths: Vec<RelativePath>,
    pub invalidate: Vec<RelativePath>,
}

impl RuntimeConfig {
    pub fn resolve(cli: Cli, file: ProbeConfig) -> Result<Self, PathParseError> {
        let paths = file
            .paths
            .iter()
            .chain(&cli.paths)
            .map(|path| RelativePath::parse(path))
            .collect::<Result<Vec<_>, _>>()?;
        let invalidate = file
            .invalidate
            .iter()
            .map(|path| RelativePath::parse(path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: cli.root,
            case_sensitivity: cli
                .case_sensitivity
                .map(CaseMode::to_case_sensitivity)
                .or(file.case_sensitivity)
                .unwrap_or_default(),
            list_directories: cli.list_directories || file.list_directories.unwrap_or(false),
            fail_fast: cli.fail_fast || file.fail_fast.unwrap_or(false),
            passes: cli.passes,
            paths,
            invalidate,
        })
    }
}
