use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use compio::runtime::spawn;
use fsnap::snapshot::{FileSystemState, Lookup, RelativePath};
use futures::StreamExt;
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::probe::{ProbeError, list_directory, probe_path};

/// Number of worker threads when unable to determine system parallelism
const DEFAULT_WORKER_THREADS: NonZeroUsize = NonZeroUsize::MIN;

/// What one pass learned about one requested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub pass: usize,
    pub path: RelativePath,
    pub lookup: Lookup,
    /// Answered by the snapshot without touching the filesystem.
    pub from_cache: bool,
    /// Why the path could not be probed. The lookup is then `Unknown`.
    pub failure: Option<String>,
}

/// Position of the path in the request list, used to report in request order.
type ProbeOutcome = (usize, Result<ProbeReport, ExecutionError>);

pub struct ProbeExecutor {
    dispatcher: Dispatcher,
    state: Arc<FileSystemState>,
    runtime_config: Arc<RuntimeConfig>,
}

impl ProbeExecutor {
    pub fn new(
        state: Arc<FileSystemState>,
        runtime_config: Arc<RuntimeConfig>,
    ) -> Result<Self, ExecutorCreationError> {
        let workers_num = Self::determine_worker_count();
        debug!("Using {} worker threads for probing", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            state,
            runtime_config,
        })
    }

    fn determine_worker_count() -> NonZeroUsize {
        available_parallelism().unwrap_or(DEFAULT_WORKER_THREADS)
    }

    /// Runs every configured pass over the requested paths and returns the reports of all passes.
    pub async fn execute(&self) -> Result<Vec<ProbeReport>, ExecutionError> {
        let mut reports = Vec::new();
        for pass in 1..=self.runtime_config.passes.get() {
            if pass > 1 {
                self.invalidate_configured_paths();
            }
            reports.extend(self.run_pass(pass).await?);
        }
        Ok(reports)
    }

    fn invalidate_configured_paths(&self) {
        for path in &self.runtime_config.invalidate {
            debug!("Invalidating '{}'", path);
            self.state.invalidate(path.segments());
        }
    }

    async fn run_pass(&self, pass: usize) -> Result<Vec<ProbeReport>, ExecutionError> {
        let (probe_sender, mut probe_receiver) = mpsc::unbounded::<ProbeOutcome>();

        for (index, path) in self.runtime_config.paths.iter().enumerate() {
            self.dispatch_probe(probe_sender.clone(), index, pass, path.clone())?;
        }
        // The channel closes once every forwarded result has been sent.
        drop(probe_sender);

        self.collect_reports(&mut probe_receiver, pass).await
    }

    async fn collect_reports(
        &self,
        probe_receiver: &mut UnboundedReceiver<ProbeOutcome>,
        pass: usize,
    ) -> Result<Vec<ProbeReport>, ExecutionError> {
        let expected = self.runtime_config.paths.len();
        let mut collected = Vec::with_capacity(expected);

        // Every worker reports before the channel closes, so nothing is still writing
        // to the snapshot once a failure is returned.
        let mut first_failure = None;
        while let Some((index, result)) = probe_receiver.next().await {
            match result {
                Ok(report) => collected.push((index, report)),
                Err(error) => {
                    first_failure.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_failure {
            return Err(error);
        }
        ensure!(
            collected.len() == expected,
            PassEndedPrematurelySnafu {
                pass,
                received: collected.len(),
                expected,
            }
        );

        collected.sort_by_key(|(index, _)| *index);
        let from_cache = collected
            .iter()
            .filter(|(_, report)| report.from_cache)
            .count();
        info!("Pass {pass}: {from_cache} of {expected} paths answered from the snapshot");

        Ok(collected.into_iter().map(|(_, report)| report).collect())
    }

    /// Dispatch a probe to a worker and forward its report to the pass receiver
    fn dispatch_probe(
        &self,
        probe_sender: UnboundedSender<ProbeOutcome>,
        index: usize,
        pass: usize,
        path: RelativePath,
    ) -> Result<(), ExecutionError> {
        let state = Arc::clone(&self.state);
        let root = self.runtime_config.root.clone();
        let list_directories = self.runtime_config.list_directories;
        let fail_fast = self.runtime_config.fail_fast;
        let worker_path = path.clone();

        let receiver = self
            .dispatcher
            .dispatch(move || async move {
                resolve(&state, &root, &worker_path, list_directories).await
            })
            .map_err(|e| ExecutionError::ProbeDispatchError {
                path: path.to_string(),
                error: e.to_string(),
            })?;

        debug!("Dispatched probe of '{}'", path);

        spawn(async move {
            let result = match receiver.await {
                Ok(Ok((lookup, from_cache))) => Ok(ProbeReport {
                    pass,
                    path,
                    lookup,
                    from_cache,
                    failure: None,
                }),
                Ok(Err(source)) if fail_fast => Err(ExecutionError::ProbeFailedError {
                    path: path.to_string(),
                    source,
                }),
                Ok(Err(source)) => {
                    warn!("Failed to probe '{}': {}", path, source);
                    Ok(ProbeReport {
                        pass,
                        path,
                        lookup: Lookup::Unknown,
                        from_cache: false,
                        failure: Some(source.to_string()),
                    })
                }
                Err(source) => {
                    debug!("Probe of '{}' was canceled: {}", path, source);
                    Err(ExecutionError::ProbeCanceledError {
                        path: path.to_string(),
                        source,
                    })
                }
            };

            if let Err(send_err) = probe_sender.unbounded_send((index, result)) {
                debug!("Failed to forward probe result: {}", send_err);
            }
        })
        .detach();

        Ok(())
    }
}

/// Answers from the snapshot when it knows enough, otherwise probes and records the result.
async fn resolve(
    state: &FileSystemState,
    root: &Path,
    path: &RelativePath,
    list_directories: bool,
) -> Result<(Lookup, bool), ProbeError> {
    let cached = state.query(path.segments());
    let needs_probe = match &cached {
        Lookup::Unknown => true,
        Lookup::PartialDirectory => list_directories,
        Lookup::Complete(_) => false,
    };
    if !needs_probe {
        debug!("Answered '{}' from the snapshot", path);
        return Ok((cached, true));
    }

    let metadata = probe_path(root, path).await?;
    if metadata.is_directory() && list_directories {
        let entries = list_directory(root, path).await?;
        state.store_listing(path.segments(), entries);
    } else {
        state.store(path.segments(), metadata);
    }

    Ok((state.query(path.segments()), false))
}

#[derive(Debug, Snafu)]
pub enum ExecutorCreationError {
    #[snafu(display("Failed to create probe dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
pub enum ExecutionError {
    #[snafu(display("Failed to dispatch probe of '{}': {}", path, error))]
    ProbeDispatchError { path: String, error: String },
    #[snafu(display("Failed to probe '{}'", path))]
    ProbeFailedError { path: String, source: ProbeError },
    #[snafu(display("Probe of '{}' was canceled", path))]
    ProbeCanceledError {
        path: String,
        source: futures_channel::oneshot::Canceled,
    },
    #[snafu(display("Pass {} ended after {} of {} probes", pass, received, expected))]
    PassEndedPrematurely {
        pass: usize,
        received: usize,
        expected: usize,
    },
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use fsnap::snapshot::{CaseSensitivity, EntryKind, Metadata};
    use rstest::*;
    use tempfile::TempDir;

    #[fixture]
    fn project() -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir(dir.path().join("src")).expect("Failed to create src");
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}")
            .expect("Failed to write lib.rs");
        dir
    }

    fn runtime_config(
        root: PathBuf,
        paths: &[&str],
        invalidate: &[&str],
        list_directories: bool,
        fail_fast: bool,
    ) -> Arc<RuntimeConfig> {
        let parse = |paths: &[&str]| {
            paths
                .iter()
                .map(|path| RelativePath::parse(path).expect("Invalid relative path"))
                .collect()
        };
        Arc::new(RuntimeConfig {
            root,
            case_sensitivity: CaseSensitivity::Sensitive,
            list_directories,
            fail_fast,
            passes: NonZeroUsize::new(2).unwrap(),
            paths: parse(paths),
            invalidate: parse(invalidate),
        })
    }

    fn executor(config: Arc<RuntimeConfig>) -> (ProbeExecutor, Arc<FileSystemState>) {
        let state = Arc::new(FileSystemState::new(config.case_sensitivity));
        let executor = ProbeExecutor::new(Arc::clone(&state), config).expect("Failed to create executor");
        (executor, state)
    }

    #[rstest]
    #[compio::test]
    async fn second_pass_is_answered_from_the_snapshot(project: TempDir) {
        let config = runtime_config(
            project.path().to_path_buf(),
            &["src/lib.rs", "src/missing.rs", "src"],
            &[],
            false,
            false,
        );
        let (executor, _) = executor(config);

        let reports = executor.execute().await.unwrap();

        assert_eq!(reports.len(), 6);
        assert!(reports[..3].iter().all(|report| !report.from_cache));
        assert!(reports[3..].iter().all(|report| report.from_cache));
        assert_eq!(reports[0].lookup.kind(), Some(EntryKind::RegularFile));
        assert_eq!(reports[1].lookup, Lookup::Complete(Metadata::Missing));
        assert_eq!(reports[2].lookup, Lookup::PartialDirectory);
        assert_eq!(
            reports.iter().map(|report| report.pass).collect::<Vec<_>>(),
            [1, 1, 1, 2, 2, 2]
        );
    }

    #[rstest]
    #[compio::test]
    async fn invalidated_paths_are_probed_again(project: TempDir) {
        let config = runtime_config(
            project.path().to_path_buf(),
            &["src/lib.rs", "src"],
            &["src/lib.rs"],
            false,
            false,
        );
        let (executor, _) = executor(config);

        let reports = executor.execute().await.unwrap();

        assert!(!reports[2].from_cache);
        assert!(reports[3].from_cache);
    }

    #[rstest]
    #[compio::test]
    async fn listing_records_complete_directories(project: TempDir) {
        let config = runtime_config(project.path().to_path_buf(), &["src"], &[], true, false);
        let (executor, state) = executor(config);

        let reports = executor.execute().await.unwrap();

        assert_eq!(reports[0].lookup, Lookup::Complete(Metadata::Directory));
        assert!(reports[1].from_cache);
        assert_eq!(
            state.query(&["src", "other.rs"]),
            Lookup::Complete(Metadata::Missing)
        );
        assert_eq!(
            state.query(&["src", "lib.rs"]).kind(),
            Some(EntryKind::RegularFile)
        );
    }

    #[rstest]
    #[compio::test]
    async fn no_paths_no_reports(project: TempDir) {
        let config = runtime_config(project.path().to_path_buf(), &[], &[], false, false);
        let (executor, state) = executor(config);

        assert!(executor.execute().await.unwrap().is_empty());
        assert!(state.snapshot().is_empty());
    }

    #[cfg(unix)]
    #[rstest]
    #[compio::test]
    async fn sockets_are_reported_as_unknown_and_the_pass_goes_on(project: TempDir) {
        let _socket = std::os::unix::net::UnixListener::bind(project.path().join("server.sock"))
            .expect("Failed to bind socket");
        let config = runtime_config(
            project.path().to_path_buf(),
            &["server.sock", "src/lib.rs"],
            &[],
            false,
            false,
        );
        let (executor, state) = executor(config);

        let reports = executor.execute().await.unwrap();

        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].lookup, Lookup::Unknown);
        assert!(reports[0].failure.is_some());
        assert_eq!(reports[1].lookup.kind(), Some(EntryKind::RegularFile));
        assert!(reports[1].failure.is_none());
        assert!(!reports[2].from_cache);
        assert!(reports[2].failure.is_some());
        assert!(reports[3].from_cache);
        assert_eq!(state.query(&["server.sock"]), Lookup::Unknown);
    }

    #[cfg(unix)]
    #[rstest]
    #[compio::test]
    async fn fail_fast_ends_the_run_at_a_socket(project: TempDir) {
        let _socket = std::os::unix::net::UnixListener::bind(project.path().join("server.sock"))
            .expect("Failed to bind socket");
        let config = runtime_config(
            project.path().to_path_buf(),
            &["src/lib.rs", "server.sock"],
            &[],
            false,
            true,
        );
        let (executor, state) = executor(config);

        let result = executor.execute().await;

        match result {
            Err(ExecutionError::ProbeFailedError { path, .. }) => assert_eq!(path, "server.sock"),
            other => panic!("Expected ProbeFailedError, got {other:?}"),
        }
        assert_eq!(
            state.query(&["src", "lib.rs"]).kind(),
            Some(EntryKind::RegularFile)
        );
    }
}
