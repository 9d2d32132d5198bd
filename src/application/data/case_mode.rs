use clap::ValueEnum;
use fsnap::snapshot::CaseSensitivity;

/// Command line and `fsnap.yaml` spelling of a [`CaseSensitivity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaseMode {
    Sensitive,
    Insensitive,
}

impl CaseMode {
    pub fn to_case_sensitivity(self) -> CaseSensitivity {
        match self {
            CaseMode::Sensitive => CaseSensitivity::Sensitive,
            CaseMode::Insensitive => CaseSensitivity::Insensitive,
        }
    }
}
