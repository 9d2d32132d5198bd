use std::sync::Arc;

use tracing::debug;

use super::provider::{BoxedError, BuildService};
use crate::snapshot::{CaseSensitivity, FileSystemState};

#[derive(Debug, Clone, Default)]
pub struct FileSystemStateParameters {
    pub case_sensitivity: CaseSensitivity,
}

/// Build service owning the shared snapshot of the file system.
#[derive(Debug)]
pub struct FileSystemStateService {
    state: Arc<FileSystemState>,
}

impl FileSystemStateService {
    pub const NAME: &'static str = "fileSystemState";

    pub fn state(&self) -> &Arc<FileSystemState> {
        &self.state
    }
}

impl BuildService for FileSystemStateService {
    type Parameters = FileSystemStateParameters;

    fn create(parameters: &Self::Parameters) -> Result<Self, BoxedError> {
        Ok(Self {
            state: Arc::new(FileSystemState::new(parameters.case_sensitivity)),
        })
    }

    /// Nothing observed during this build may be trusted by the next one.
    fn stop(&self) -> Result<(), BoxedError> {
        debug!(
            "Dropping {} snapshot nodes",
            self.state.snapshot().node_count()
        );
        self.state.invalidate_all();
        Ok(())
    }
}
