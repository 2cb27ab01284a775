use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::task::JoinSet;

use crate::assets;
use crate::compiler::{self, CompileRequest, Compiler};
use crate::error::{PackageError, Result};
use crate::project::{MANIFEST_FILE, ProjectDescriptor, README_FILE};

/// Scratch tree the archive is built from. Removed by [`StagingDirectory::remove`],
/// or on drop if a run unwinds before reaching it.
#[derive(Debug)]
pub struct StagingDirectory {
    dir: TempDir,
}

impl StagingDirectory {
    pub fn create(temp_root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("package-tool-")
            .tempdir_in(temp_root)
            .map_err(|err| {
                PackageError::io(
                    format!("failed to create staging directory in {}", temp_root.display()),
                    err,
                )
            })?;
        tracing::debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Best-effort removal; failures are logged and otherwise ignored.
    pub fn remove(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove staging directory");
        } else {
            tracing::debug!(path = %path.display(), "removed staging directory");
        }
    }
}

/// What goes into the staging tree besides the compiled sources.
#[derive(Debug, Clone)]
pub struct StagingInputs<'a> {
    pub project: &'a ProjectDescriptor,
    /// Manifest to ship, either the original or a stamped scratch copy.
    pub manifest: &'a Path,
    pub asset_patterns: &'a [String],
}

/// Populate `staging` by compiling and copying concurrently.
///
/// Every task, the compiler included, runs to completion before this
/// returns, so nothing writes into the staging tree afterwards. The first
/// failure is reported.
pub async fn build(
    inputs: StagingInputs<'_>,
    staging: &StagingDirectory,
    compiler: Arc<dyn Compiler>,
) -> Result<()> {
    let out_dir = staging.path().to_path_buf();
    let source_root = inputs.project.source.clone();
    let sources = tokio::task::spawn_blocking(move || compiler::collect_sources(&source_root))
        .await
        .map_err(|err| {
            PackageError::io("source enumeration task failed", std::io::Error::other(err))
        })??;
    tracing::debug!(count = sources.len(), "collected sources");

    let mut tasks = JoinSet::new();

    let request = CompileRequest::new(sources, &inputs.project.source, &out_dir);
    tasks.spawn(async move { compiler.compile(&request).await });

    tasks.spawn(copy_file(
        inputs.manifest.to_path_buf(),
        out_dir.join(MANIFEST_FILE),
        MANIFEST_FILE,
    ));
    if let Some(readme) = &inputs.project.readme {
        tasks.spawn(copy_file(
            readme.clone(),
            out_dir.join(README_FILE),
            README_FILE,
        ));
    }

    let source_dir = inputs.project.source.clone();
    let asset_dest = out_dir.clone();
    let patterns = inputs.asset_patterns.to_vec();
    tasks.spawn(async move {
        let copied = assets::copy_matching(&source_dir, &asset_dest, &patterns).await?;
        tracing::info!(copied, "copied assets");
        Ok::<(), PackageError>(())
    });

    let mut first_error: Option<PackageError> = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(err) => PackageError::io("staging task panicked", std::io::Error::other(err)),
        };
        if first_error.is_none() {
            tracing::debug!(error = %failure, "staging failed; waiting for remaining tasks");
            first_error = Some(failure);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn copy_file(from: PathBuf, to: PathBuf, label: &'static str) -> Result<()> {
    tokio::fs::copy(&from, &to)
        .await
        .map_err(|err| PackageError::copy(label, err))?;
    tracing::debug!(from = %from.display(), to = %to.display(), "copied {label}");
    Ok(())
}
