use std::path::{Path, PathBuf};

use glob::MatchOptions;
use tokio::task::JoinSet;

use crate::error::{PackageError, Result};

/// Asset patterns copied by the base `build` variant (source root only).
pub const FLAT_ASSET_PATTERNS: &[&str] = &["*.png", "*.svg", "*.json"];
/// Asset patterns copied by the `publish` variant (whole source tree).
pub const RECURSIVE_ASSET_PATTERNS: &[&str] = &["**/*.png", "**/*.svg", "**/*.json"];

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Copy everything matching `patterns` from `source_dir` into `dest_dir`.
/// Patterns run concurrently. When one fails the others still run to
/// completion and the first failure is returned.
pub async fn copy_matching(
    source_dir: &Path,
    dest_dir: &Path,
    patterns: &[String],
) -> Result<usize> {
    let mut tasks = JoinSet::new();
    for pattern in patterns {
        let source_dir = source_dir.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        let pattern = pattern.clone();
        tasks.spawn(async move { copy_pattern(&source_dir, &dest_dir, &pattern).await });
    }

    let mut copied = 0;
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|err| PackageError::io("asset copy task failed", std::io::Error::other(err)))
            .and_then(|result| result);
        match outcome {
            Ok(count) => copied += count,
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(copied),
    }
}

/// Copy the files matching a single pattern, keeping their path relative to
/// the pattern's literal prefix. A pattern with no matches copies nothing.
pub async fn copy_pattern(source_dir: &Path, dest_dir: &Path, pattern: &str) -> Result<usize> {
    let base = source_dir.join(literal_base(pattern));
    let matches = {
        let source_dir = source_dir.to_path_buf();
        let owned = pattern.to_string();
        tokio::task::spawn_blocking(move || list_matches(&source_dir, &owned))
            .await
            .map_err(|err| PackageError::copy(pattern, std::io::Error::other(err)))?
            .map_err(|err| PackageError::copy(pattern, err))?
    };

    for path in &matches {
        let relative = path.strip_prefix(&base).map_err(|_| {
            PackageError::copy(
                pattern,
                std::io::Error::other(format!(
                    "{} is outside {}",
                    path.display(),
                    base.display()
                )),
            )
        })?;
        let target = dest_dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| PackageError::copy(pattern, err))?;
        }
        tokio::fs::copy(path, &target)
            .await
            .map_err(|err| PackageError::copy(pattern, err))?;
        tracing::debug!(from = %path.display(), to = %target.display(), "copied asset");
    }
    Ok(matches.len())
}

/// Leading directory components of `pattern` that contain no glob syntax.
fn literal_base(pattern: &str) -> PathBuf {
    let mut components = pattern.split('/').collect::<Vec<_>>();
    components.pop();
    components
        .into_iter()
        .take_while(|component| !component.contains(GLOB_META))
        .filter(|component| !component.is_empty() && *component != ".")
        .collect()
}

fn list_matches(source_dir: &Path, pattern: &str) -> std::io::Result<Vec<PathBuf>> {
    let root = source_dir.to_str().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not valid UTF-8", source_dir.display()),
        )
    })?;
    let full = format!("{}/{pattern}", glob::Pattern::escape(root));
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths = glob::glob_with(&full, options)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            matches.push(path);
        }
    }
    Ok(matches)
}

pub fn patterns(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|pattern| pattern.to_string()).collect()
}
