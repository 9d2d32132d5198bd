//! Named, lazily created services shared for the duration of a build.

mod file_system_state;
mod provider;
mod registry;

pub use file_system_state::{FileSystemStateParameters, FileSystemStateService};
pub use provider::{BoxedError, BuildService, BuildServiceProvider, ServiceLifecycleError};
pub use registry::{BuildServiceRegistry, RegistryError};
