use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use snafu::Snafu;
use tracing::debug;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A service that is created on first use and stopped when the build finishes.
pub trait BuildService: Sized + Send + Sync + 'static {
    type Parameters: Default + Clone + Debug + Send + Sync + 'static;

    fn create(parameters: &Self::Parameters) -> Result<Self, BoxedError>;

    fn stop(&self) -> Result<(), BoxedError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum ServiceLifecycleError {
    #[snafu(display("Failed to create service '{}': {}", name, message))]
    CreateError { name: String, message: String },
    #[snafu(display("Failed to stop service '{}': {}", name, message))]
    StopError { name: String, message: String },
}

struct ProviderState<S> {
    /// Outcome of the first creation attempt; failures are memoized too.
    instance: Option<Result<Arc<S>, ServiceLifecycleError>>,
    stopped: bool,
}

/// Hands out the single instance of a registered service.
pub struct BuildServiceProvider<S: BuildService> {
    name: String,
    parameters: S::Parameters,
    state: Mutex<ProviderState<S>>,
}

impl<S: BuildService> BuildServiceProvider<S> {
    pub fn new(name: impl Into<String>, parameters: S::Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
            state: Mutex::new(ProviderState {
                instance: None,
                stopped: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &S::Parameters {
        &self.parameters
    }

    /// Creates the service on first call. Later calls return the same instance, or the same error.
    pub fn get(&self) -> Result<Arc<S>, ServiceLifecycleError> {
        let mut state = self.lock();
        state
            .instance
            .get_or_insert_with(|| {
                debug!("Creating service '{}' with {:?}", self.name, self.parameters);
                S::create(&self.parameters)
                    .map(Arc::new)
                    .map_err(|error| ServiceLifecycleError::CreateError {
                        name: self.name.clone(),
                        message: error.to_string(),
                    })
            })
            .clone()
    }

    pub fn is_created(&self) -> bool {
        matches!(self.lock().instance, Some(Ok(_)))
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Stops the service if it was created and not stopped yet.
    pub fn maybe_stop(&self) -> Result<(), ServiceLifecycleError> {
        let mut state = self.lock();
        if state.stopped {
            return Ok(());
        }
        let Some(Ok(service)) = &state.instance else {
            return Ok(());
        };
        let service = Arc::clone(service);
        state.stopped = true;

        debug!("Stopping service '{}'", self.name);
        service
            .stop()
            .map_err(|error| ServiceLifecycleError::StopError {
                name: self.name.clone(),
                message: error.to_string(),
            })
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: BuildService> Debug for BuildServiceProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildServiceProvider")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("created", &self.is_created())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
