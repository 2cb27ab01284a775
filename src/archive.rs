use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PackageError, Result};

const COMPRESSION_LEVEL: i64 = 9;

/// `<slug>-<version>.zip`, where the slug drops any `scope/` prefix of the
/// package name. With `underscore_version` the version's dots become `_`.
pub fn archive_name(package_name: &str, version: &str, underscore_version: bool) -> String {
    let slug = package_name
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(package_name);
    let version = if underscore_version {
        version.replace('.', "_")
    } else {
        version.to_string()
    };
    format!("{slug}-{version}.zip")
}

/// Zip the contents of `staging_dir` into `publish_dir/archive_name`,
/// replacing an existing archive of that name. Returns once the file is
/// flushed and closed.
pub async fn archive(
    staging_dir: &Path,
    publish_dir: &Path,
    archive_name: &str,
) -> Result<PathBuf> {
    let staging_dir = staging_dir.to_path_buf();
    let destination = publish_dir.join(archive_name);
    let target = destination.clone();
    tokio::task::spawn_blocking(move || write_archive(&staging_dir, &target))
        .await
        .map_err(|err| PackageError::archive(&destination, err))??;
    Ok(destination)
}

fn write_archive(staging_dir: &Path, destination: &Path) -> Result<()> {
    if destination.exists() {
        tracing::debug!(path = %destination.display(), "replacing existing archive");
        fs::remove_file(destination).map_err(|err| PackageError::archive(destination, err))?;
    }

    let file = File::create(destination).map_err(|err| PackageError::archive(destination, err))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut entries = 0usize;
    for entry in WalkDir::new(staging_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| PackageError::archive(destination, err))?;
        let relative = entry
            .path()
            .strip_prefix(staging_dir)
            .map_err(|err| PackageError::archive(destination, err))?;
        let name = entry_name(relative);
        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)
                .map_err(|err| PackageError::archive(destination, err))?;
            continue;
        }
        zip.start_file(name.as_str(), options)
            .map_err(|err| PackageError::archive(destination, err))?;
        let mut source =
            File::open(entry.path()).map_err(|err| PackageError::archive(destination, err))?;
        std::io::copy(&mut source, &mut zip)
            .map_err(|err| PackageError::archive(destination, err))?;
        entries += 1;
    }

    let writer = zip
        .finish()
        .map_err(|err| PackageError::archive(destination, err))?;
    let file = writer
        .into_inner()
        .map_err(|err| PackageError::archive(destination, err.into_error()))?;
    file.sync_all()
        .map_err(|err| PackageError::archive(destination, err))?;
    drop(file);

    tracing::info!(path = %destination.display(), files = entries, "wrote archive");
    Ok(())
}

/// Archive entry names always use `/`.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
