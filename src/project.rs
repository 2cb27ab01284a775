use std::path::{Path, PathBuf};

use crate::error::{PackageError, Result};

pub const SOURCE_DIR: &str = "src";
pub const MANIFEST_FILE: &str = "package.json";
pub const README_FILE: &str = "README.md";
pub const PUBLISH_DIR: &str = "publish";

/// Fixed layout of a project folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub root: PathBuf,
    pub source: PathBuf,
    pub manifest: PathBuf,
    /// Set only when a readme is present on disk.
    pub readme: Option<PathBuf>,
    pub publish: PathBuf,
}

impl ProjectDescriptor {
    /// Derive every path from `root` and check the required ones exist.
    /// Nothing on disk is touched here.
    pub fn resolve(root: &Path, require_readme: bool) -> Result<Self> {
        ensure("project folder", root, Path::is_dir)?;
        let source = root.join(SOURCE_DIR);
        ensure("source directory", &source, Path::is_dir)?;
        let manifest = root.join(MANIFEST_FILE);
        ensure("manifest", &manifest, Path::is_file)?;

        let readme_path = root.join(README_FILE);
        if require_readme {
            ensure("readme", &readme_path, Path::is_file)?;
        }
        let readme = readme_path.is_file().then_some(readme_path);

        Ok(Self {
            root: root.to_path_buf(),
            source,
            manifest,
            readme,
            publish: root.join(PUBLISH_DIR),
        })
    }
}

/// `check` is `Path::is_dir` or `Path::is_file`; anything else at `path`
/// counts as missing.
fn ensure(what: &'static str, path: &Path, check: fn(&Path) -> bool) -> Result<()> {
    if check(path) {
        return Ok(());
    }
    Err(PackageError::Precondition {
        what,
        path: path.to_path_buf(),
    })
}
