use std::sync::Arc;

use fsnap::services::{
    BuildServiceRegistry, FileSystemStateService, RegistryError, ServiceLifecycleError,
};
use fsnap::snapshot::PathParseError;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::application::data::{configure_colors, format_report};
use crate::cli::Cli;
use crate::config::probe_config::{ProbeConfig, ProbeConfigCreationError};
use crate::executor::{ExecutionError, ExecutorCreationError, ProbeExecutor};

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        Self::run_with_registry(cli, &BuildServiceRegistry::new()).await
    }

    /// Runs against `registry`. Its services are stopped whether or not the probing succeeds.
    pub async fn run_with_registry(
        cli: Cli,
        registry: &BuildServiceRegistry,
    ) -> Result<(), ApplicationError> {
        let config = ProbeConfig::read(&cli.root)
            .await
            .context(ProbeConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let runtime_config = RuntimeConfig::resolve(cli, config).context(InvalidPathSnafu)?;
        if runtime_config.paths.is_empty() {
            warn!("No paths to probe, pass them as arguments or list them in fsnap.yaml");
            return Ok(());
        }

        let case_sensitivity = runtime_config.case_sensitivity;
        let service = registry
            .maybe_register::<FileSystemStateService, _>(
                FileSystemStateService::NAME,
                |parameters| parameters.case_sensitivity = case_sensitivity,
            )
            .context(ServiceRegistrationSnafu)?
            .get()
            .context(ServiceLifecycleSnafu)?;
        info!("Using a {} snapshot", case_sensitivity);

        let outcome = Self::probe_and_report(&service, runtime_config).await;
        let finished = registry.build_finished().context(ServiceLifecycleSnafu);

        outcome.and(finished)
    }

    async fn probe_and_report(
        service: &FileSystemStateService,
        runtime_config: RuntimeConfig,
    ) -> Result<(), ApplicationError> {
        let reports = ProbeExecutor::new(Arc::clone(service.state()), Arc::new(runtime_config))
            .context(ExecutorCreationSnafu)?
            .execute()
            .await
            .context(ApplicationExecutionSnafu)?;

        configure_colors();
        for report in &reports {
            println!("{}", format_report(report));
        }
        info!(
            "Snapshot holds {} nodes",
            service.state().snapshot().node_count()
        );

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ProbeConfigError { source: ProbeConfigCreationError },
    #[snafu(display("Invalid path in the configuration"))]
    InvalidPathError { source: PathParseError },
    #[snafu(display("Critical failure encountered while registering services"))]
    ServiceRegistrationError { source: RegistryError },
    #[snafu(display("Critical failure encountered in a service lifecycle"))]
    ServiceLifecycleError { source: ServiceLifecycleError },
    #[snafu(display("Critical failure encountered during executor creation"))]
    ExecutorCreationError { source: ExecutorCreationError },
    #[snafu(display("Critical failure encountered during application execution"))]
    ApplicationExecutionError { source: ExecutionError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(root: &TempDir, args: &[&str]) -> Cli {
        let root = root.path().to_string_lossy().to_string();
        let mut argv = vec!["fsnap".to_string(), "--root".to_string(), root];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[compio::test]
    async fn runs_against_a_project() {
        let root = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(root.path().join("fsnap.yaml"), "paths: [data.txt]\ninvalidate: [data.txt]\n")
            .expect("Failed to write config file");
        std::fs::write(root.path().join("data.txt"), "data").expect("Failed to write data");

        Application::run(cli(&root, &["missing/file"])).await.unwrap();
    }

    #[compio::test]
    async fn nothing_to_probe_is_not_an_error() {
        let root = TempDir::new().expect("Failed to create temp directory");
        Application::run(cli(&root, &[])).await.unwrap();
    }

    #[compio::test]
    async fn broken_config_is_reported() {
        let root = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(root.path().join("fsnap.yaml"), "paths: data.txt\n")
            .expect("Failed to write config file");

        let result = Application::run(cli(&root, &[])).await;
        assert!(matches!(result, Err(ApplicationError::ProbeConfigError { .. })));
    }

    #[compio::test]
    async fn absolute_paths_are_rejected() {
        let root = TempDir::new().expect("Failed to create temp directory");
        let result = Application::run(cli(&root, &["/etc/passwd"])).await;
        assert!(matches!(result, Err(ApplicationError::InvalidPathError { .. })));
    }

    #[cfg(unix)]
    #[compio::test]
    async fn services_are_stopped_when_the_run_fails() {
        let root = TempDir::new().expect("Failed to create temp directory");
        let _socket = std::os::unix::net::UnixListener::bind(root.path().join("server.sock"))
            .expect("Failed to bind socket");
        let registry = BuildServiceRegistry::new();

        let result =
            Application::run_with_registry(cli(&root, &["--fail-fast", "server.sock"]), &registry)
                .await;

        assert!(matches!(
            result,
            Err(ApplicationError::ApplicationExecutionError { .. })
        ));
        let provider = registry
            .find::<FileSystemStateService>(FileSystemStateService::NAME)
            .expect("Service should have been registered");
        assert!(provider.is_stopped());
    }

    #[cfg(unix)]
    #[compio::test]
    async fn sockets_do_not_fail_the_run_by_default() {
        let root = TempDir::new().expect("Failed to create temp directory");
        let _socket = std::os::unix::net::UnixListener::bind(root.path().join("server.sock"))
            .expect("Failed to bind socket");
        std::fs::write(root.path().join("data.txt"), "data").expect("Failed to write data");
        let registry = BuildServiceRegistry::new();

        Application::run_with_registry(cli(&root, &["server.sock", "data.txt"]), &registry)
            .await
            .unwrap();

        let provider = registry
            .find::<FileSystemStateService>(FileSystemStateService::NAME)
            .expect("Service should have been registered");
        assert!(provider.is_stopped());
        assert!(provider.get().unwrap().state().snapshot().is_empty());
    }
}
