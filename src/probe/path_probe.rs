use std::hash::Hasher;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use fsnap::snapshot::{Metadata, RelativePath};
use metrohash::MetroHash64;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::ext::{AsyncTryFrom, AsyncTryInto, BestEffortPathExt};

/// Resolves a snapshot path against the directory it is relative to.
pub fn absolute_path(root: &Path, path: &RelativePath) -> PathBuf {
    path.segments()
        .iter()
        .fold(root.to_path_buf(), |full, segment| full.join(segment))
}

fn is_absent(error: &std::io::Error) -> bool {
    matches!(error.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

impl AsyncTryFrom<&Path> for Metadata {
    type Error = ProbeError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let metadata = match path.metadata() {
            Ok(metadata) => metadata,
            Err(error) if is_absent(&error) => return Ok(Metadata::Missing),
            Err(error) => {
                return Err(error).context(PathSnafu {
                    path: path.to_path_buf(),
                });
            }
        };

        if metadata.is_dir() {
            return Ok(Metadata::Directory);
        }
        if !metadata.is_file() {
            return UnsupportedEntrySnafu {
                path: path.to_path_buf(),
            }
            .fail();
        }

        let last_modified = metadata.modified().context(PathSnafu {
            path: path.to_path_buf(),
        })?;
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            // Deleted between the two calls.
            Err(error) if is_absent(&error) => return Ok(Metadata::Missing),
            Err(error) => {
                return Err(error).context(PathSnafu {
                    path: path.to_path_buf(),
                });
            }
        };

        let mut hasher = MetroHash64::default();
        hasher.write(&bytes);

        Ok(Metadata::regular_file(
            bytes.len() as u64,
            last_modified,
            hasher.finish(),
        ))
    }
}

/// Probes `root/path`. Absent entries, including ones below a file, are reported as missing.
pub async fn probe_path(root: &Path, path: &RelativePath) -> Result<Metadata, ProbeError> {
    let full_path = absolute_path(root, path);
    let metadata: Metadata = full_path.as_path().async_try_into().await?;
    debug!("Probed '{}': {}", path, metadata.kind());
    Ok(metadata)
}

/// Lists the directory at `root/path`, probing every entry in it.
pub async fn list_directory(
    root: &Path,
    path: &RelativePath,
) -> Result<Vec<(String, Metadata)>, ProbeError> {
    let full_path = absolute_path(root, path);
    let read_dir = std::fs::read_dir(&full_path).context(PathSnafu {
        path: full_path.clone(),
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.context(PathSnafu {
            path: full_path.clone(),
        })?;
        let Ok(name) = entry.file_name().into_string() else {
            warn!(
                "Skipping entry with a non UTF-8 name in {}",
                full_path.best_effort_path_display()
            );
            continue;
        };
        let metadata = Metadata::async_try_from(entry.path().as_path()).await?;
        entries.push((name, metadata));
    }

    debug!("Listed '{}': {} entries", path, entries.len());
    Ok(entries)
}

#[derive(Debug, Snafu)]
pub enum ProbeError {
    #[snafu(display("Failed to probe path: {}", path.best_effort_path_display()))]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "The path {} is neither a regular file nor a directory",
        path.best_effort_path_display()
    ))]
    UnsupportedEntryError { path: PathBuf },
}
