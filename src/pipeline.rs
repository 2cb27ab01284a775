use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive;
use crate::assets::{self, FLAT_ASSET_PATTERNS, RECURSIVE_ASSET_PATTERNS};
use crate::compiler::Compiler;
use crate::error::{PackageError, Result};
use crate::project::ProjectDescriptor;
use crate::staging::{self, StagingDirectory, StagingInputs};
use crate::version::{self, Manifest, StampedManifest};

/// Which flavour of packaging to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Ship the manifest as-is, top-level assets only, `<name>-<version>.zip`.
    Base,
    /// Stamp a revision, require a readme, recursive assets,
    /// `<name>-<version_with_underscores>.zip`.
    Revisioned,
}

impl Variant {
    fn requires_readme(self) -> bool {
        matches!(self, Variant::Revisioned)
    }

    fn asset_patterns(self) -> Vec<String> {
        match self {
            Variant::Base => assets::patterns(FLAT_ASSET_PATTERNS),
            Variant::Revisioned => assets::patterns(RECURSIVE_ASSET_PATTERNS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub root: PathBuf,
    pub variant: Variant,
    /// Explicit revision; generated from the clock when `None`.
    pub revision: Option<String>,
    /// When false the revisioned variant ships the version unchanged.
    pub stamp_revision: bool,
    /// Parent of the staging directory and scratch manifest.
    pub temp_root: PathBuf,
}

impl PipelineOptions {
    pub fn new(root: impl Into<PathBuf>, variant: Variant, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            variant,
            revision: None,
            stamp_revision: true,
            temp_root: temp_root.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub name: String,
    pub version: String,
    pub archive: PathBuf,
}

enum PreparedManifest {
    Original { manifest: Manifest, path: PathBuf },
    Stamped(StampedManifest),
}

impl PreparedManifest {
    fn manifest(&self) -> &Manifest {
        match self {
            PreparedManifest::Original { manifest, .. } => manifest,
            PreparedManifest::Stamped(stamped) => &stamped.manifest,
        }
    }

    fn path(&self) -> &Path {
        match self {
            PreparedManifest::Original { path, .. } => path,
            PreparedManifest::Stamped(stamped) => stamped.path(),
        }
    }
}

/// Validate, stamp, stage, archive and clean up. The staging directory is
/// removed on every exit path once it has been created.
pub async fn run(options: &PipelineOptions, compiler: Arc<dyn Compiler>) -> Result<PackageReport> {
    let project = ProjectDescriptor::resolve(&options.root, options.variant.requires_readme())?;
    tracing::info!(root = %project.root.display(), variant = ?options.variant, "packaging");

    let prepared = prepare_manifest(&project, options)?;
    let name = prepared.manifest().name().to_string();
    let version = prepared.manifest().version().to_string();

    tokio::fs::create_dir_all(&project.publish)
        .await
        .map_err(|err| {
            PackageError::io(
                format!("failed to create {}", project.publish.display()),
                err,
            )
        })?;

    let archive_name = archive::archive_name(
        &name,
        &version,
        matches!(options.variant, Variant::Revisioned),
    );
    let patterns = options.variant.asset_patterns();

    let staging = StagingDirectory::create(&options.temp_root)?;
    let outcome = async {
        staging::build(
            StagingInputs {
                project: &project,
                manifest: prepared.path(),
                asset_patterns: &patterns,
            },
            &staging,
            compiler,
        )
        .await?;
        archive::archive(staging.path(), &project.publish, &archive_name).await
    }
    .await;
    staging.remove();

    let archive = outcome?;
    Ok(PackageReport {
        name,
        version,
        archive,
    })
}

fn prepare_manifest(
    project: &ProjectDescriptor,
    options: &PipelineOptions,
) -> Result<PreparedManifest> {
    if options.variant == Variant::Revisioned && options.stamp_revision {
        let stamped = version::stamp(
            &project.manifest,
            options.revision.as_deref(),
            &options.temp_root,
        )?;
        return Ok(PreparedManifest::Stamped(stamped));
    }
    let manifest = Manifest::read(&project.manifest)?;
    Ok(PreparedManifest::Original {
        manifest,
        path: project.manifest.clone(),
    })
}
