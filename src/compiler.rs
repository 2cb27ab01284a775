use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;
use which::which;

use crate::error::{PackageError, Result};
use crate::util::process::{self, CommandSpec};

const TOOL_NAME: &str = "tsc";

/// Files never handed to the compiler, matched against the path relative to
/// the source directory.
pub const SOURCE_EXCLUDES: &[&str] = &["*.test.*", "*.spec.*", "**/test/**"];
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Strictness, module and emit flags passed on every compile.
pub const COMPILER_FLAGS: &[&str] = &[
    "--module",
    "commonjs",
    "--moduleResolution",
    "node",
    "--target",
    "es2017",
    "--strict",
    "--noImplicitAny",
    "--strictNullChecks",
    "--noUnusedLocals",
    "--noUnusedParameters",
    "--noImplicitReturns",
    "--esModuleInterop",
    "--declaration",
    "--sourceMap",
];

#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub files: Vec<PathBuf>,
    pub flags: Vec<String>,
    /// Common root of `files`; output keeps paths relative to it.
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl CompileRequest {
    pub fn new(files: Vec<PathBuf>, root_dir: &Path, out_dir: &Path) -> Self {
        Self {
            files,
            flags: COMPILER_FLAGS.iter().map(|flag| flag.to_string()).collect(),
            root_dir: root_dir.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
        }
    }
}

/// Something that turns sources into output under `out_dir`.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, request: &CompileRequest) -> Result<()>;
}

/// Compilable sources under `source_dir`, sorted, test files excluded.
pub fn collect_sources(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let excludes = SOURCE_EXCLUDES
        .iter()
        .map(|raw| Pattern::new(raw))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| {
            PackageError::io(
                "invalid source exclusion pattern",
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
            )
        })?;
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut sources = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            PackageError::io(
                format!("failed to walk {}", source_dir.display()),
                err.into(),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let compilable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        if !compilable {
            continue;
        }
        let relative = path.strip_prefix(source_dir).unwrap_or(path);
        if excludes
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, options))
        {
            tracing::debug!(path = %relative.display(), "skipping excluded source");
            continue;
        }
        sources.push(path.to_path_buf());
    }
    Ok(sources)
}

/// The TypeScript compiler, run as a child process whose output goes
/// straight to our own stdout/stderr.
#[derive(Debug, Clone)]
pub struct TscCompiler {
    program: OsString,
}

impl TscCompiler {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `tsc`: configured path, then the project's
    /// `node_modules/.bin`, then `PATH`.
    pub fn locate(configured: Option<&Path>, project_root: &Path) -> Result<Self> {
        if let Some(custom) = configured {
            if !custom.exists() {
                return Err(PackageError::Precondition {
                    what: "configured compiler",
                    path: custom.to_path_buf(),
                });
            }
            return Ok(Self::new(custom.as_os_str()));
        }

        let local = project_root.join("node_modules").join(".bin").join(TOOL_NAME);
        if local.is_file() {
            return Ok(Self::new(local.into_os_string()));
        }

        match which(TOOL_NAME) {
            Ok(path) => Ok(Self::new(path.into_os_string())),
            // Spawning will fail and surface as a compile failure.
            Err(_) => Ok(Self::new(TOOL_NAME)),
        }
    }

    #[cfg(test)]
    fn program(&self) -> &OsString {
        &self.program
    }

    fn command(&self, request: &CompileRequest) -> CommandSpec {
        CommandSpec::new(self.program.clone())
            .args(request.flags.iter().map(OsString::from))
            .arg("--rootDir")
            .arg(request.root_dir.as_os_str())
            .arg("--outDir")
            .arg(request.out_dir.as_os_str())
            .args(request.files.iter().map(|file| file.as_os_str().to_os_string()))
    }
}

#[async_trait]
impl Compiler for TscCompiler {
    async fn compile(&self, request: &CompileRequest) -> Result<()> {
        if request.files.is_empty() {
            tracing::info!("no sources to compile");
            return Ok(());
        }
        let spec = self.command(request);
        tracing::info!(
            program = %self.program.to_string_lossy(),
            files = request.files.len(),
            "compiling"
        );
        let status = process::run_inherit(&spec)
            .await
            .map_err(|err| PackageError::CompileFailure {
                code: 1,
                message: format!(
                    "failed to spawn `{}`: {err}",
                    self.program.to_string_lossy()
                ),
            })?;
        if status.success() {
            return Ok(());
        }
        Err(PackageError::CompileFailure {
            code: status.code().unwrap_or(1),
            message: format!("`{}` exited with {status}", self.program.to_string_lossy()),
        })
    }
}
