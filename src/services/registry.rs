use std::any::{Any, type_name};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashlink::LinkedHashMap;
use snafu::{Snafu, ensure};
use tracing::{debug, warn};

use super::provider::{BuildService, BuildServiceProvider, ServiceLifecycleError};

trait RegisteredProvider: Send + Sync {
    fn maybe_stop(&self) -> Result<(), ServiceLifecycleError>;
}

impl<S: BuildService> RegisteredProvider for BuildServiceProvider<S> {
    fn maybe_stop(&self) -> Result<(), ServiceLifecycleError> {
        BuildServiceProvider::maybe_stop(self)
    }
}

/// One provider seen both as something to stop and as something to downcast.
struct Registration {
    service_type: &'static str,
    provider: Arc<dyn RegisteredProvider>,
    typed: Arc<dyn Any + Send + Sync>,
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum RegistryError {
    #[snafu(display("Service '{}' has already been registered", name))]
    AlreadyRegistered { name: String },
    #[snafu(display(
        "Service '{}' is registered as {}, not as {}",
        name,
        registered,
        requested
    ))]
    TypeMismatch {
        name: String,
        registered: &'static str,
        requested: &'static str,
    },
}

/// Registrations of build services, kept in registration order.
#[derive(Default)]
pub struct BuildServiceRegistry {
    registrations: Mutex<LinkedHashMap<String, Registration>>,
}

impl BuildServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: BuildService>(
        &self,
        name: impl Into<String>,
        parameters: S::Parameters,
    ) -> Result<Arc<BuildServiceProvider<S>>, RegistryError> {
        let name = name.into();
        let mut registrations = self.lock();
        ensure!(
            !registrations.contains_key(&name),
            AlreadyRegisteredSnafu { name }
        );

        Ok(Self::insert(&mut registrations, name, parameters))
    }

    /// Returns the provider registered under `name`, registering one with
    /// default parameters adjusted by `configure` if there is none yet.
    pub fn maybe_register<S, F>(
        &self,
        name: impl Into<String>,
        configure: F,
    ) -> Result<Arc<BuildServiceProvider<S>>, RegistryError>
    where
        S: BuildService,
        F: FnOnce(&mut S::Parameters),
    {
        let name = name.into();
        let mut registrations = self.lock();
        if let Some(existing) = registrations.get(&name) {
            return Self::downcast(&name, existing);
        }

        let mut parameters = S::Parameters::default();
        configure(&mut parameters);
        Ok(Self::insert(&mut registrations, name, parameters))
    }

    pub fn registration_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn find<S: BuildService>(&self, name: &str) -> Option<Arc<BuildServiceProvider<S>>> {
        self.lock()
            .get(name)
            .and_then(|registration| Self::downcast(name, registration).ok())
    }

    /// Stops every created service in registration order. All services are
    /// given the chance to stop; the first failure is returned.
    pub fn build_finished(&self) -> Result<(), ServiceLifecycleError> {
        let providers = self
            .lock()
            .values()
            .map(|registration| Arc::clone(&registration.provider))
            .collect::<Vec<_>>();

        let mut first_failure = None;
        for provider in providers {
            if let Err(error) = provider.maybe_stop() {
                warn!("{error}");
                first_failure.get_or_insert(error);
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    fn insert<S: BuildService>(
        registrations: &mut LinkedHashMap<String, Registration>,
        name: String,
        parameters: S::Parameters,
    ) -> Arc<BuildServiceProvider<S>> {
        debug!("Registering service '{}' as {}", name, type_name::<S>());
        let provider = Arc::new(BuildServiceProvider::<S>::new(name.clone(), parameters));
        registrations.insert(
            name,
            Registration {
                service_type: type_name::<S>(),
                provider: provider.clone(),
                typed: provider.clone(),
            },
        );
        provider
    }

    fn downcast<S: BuildService>(
        name: &str,
        registration: &Registration,
    ) -> Result<Arc<BuildServiceProvider<S>>, RegistryError> {
        Arc::clone(&registration.typed)
            .downcast::<BuildServiceProvider<S>>()
            .map_err(|_| RegistryError::TypeMismatch {
                name: name.to_owned(),
                registered: registration.service_type,
                requested: type_name::<S>(),
            })
    }

    fn lock(&self) -> MutexGuard<'_, LinkedHashMap<String, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
