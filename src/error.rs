use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackageError>;

/// Everything that can stop a packaging run.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("{what} not found at {}", .path.display())]
    Precondition { what: &'static str, path: PathBuf },

    #[error("failed to read manifest {}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid manifest {}: {message}", .path.display())]
    ManifestShape { path: PathBuf, message: String },

    #[error("failed to copy `{pattern}`")]
    Copy {
        pattern: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler failed with exit code {code}: {message}")]
    CompileFailure { code: i32, message: String },

    #[error("failed to write archive {}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PackageError {
    pub fn manifest_read(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PackageError::ManifestRead {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn manifest_shape(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PackageError::ManifestShape {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn copy(pattern: impl Into<String>, source: std::io::Error) -> Self {
        PackageError::Copy {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn archive(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PackageError::Archive {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PackageError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit status for this failure. Compiler failures keep the
    /// compiler's own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PackageError::CompileFailure { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
