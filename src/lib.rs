pub mod archive;
pub mod assets;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod project;
pub mod staging;
pub mod util;
pub mod version;

pub use error::{PackageError, Result};
pub use pipeline::{PackageReport, PipelineOptions, Variant};
