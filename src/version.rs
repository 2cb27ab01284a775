use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tempfile::NamedTempFile;
use time::OffsetDateTime;

use crate::error::{PackageError, Result};

/// 10-second ticks between the unix epoch and 2020-01-01T00:00:00Z.
pub const REVISION_TICK_OFFSET: i64 = 157_783_680;
const REVISION_TICK_SECONDS: i64 = 10;
const REVISION_MARKER: &str = "dev";

/// A parsed `package.json`. Keys keep their file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    fields: Map<String, JsonValue>,
}

impl Manifest {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| PackageError::manifest_read(path, err))?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self> {
        let value: JsonValue =
            serde_json::from_str(raw).map_err(|err| PackageError::manifest_read(path, err))?;
        let JsonValue::Object(fields) = value else {
            return Err(PackageError::manifest_shape(
                path,
                "top-level value must be an object",
            ));
        };
        let manifest = Self { fields };
        manifest.require_str(path, "name")?;
        let version = manifest.require_str(path, "version")?;
        ensure_file_name_safe(path, version)?;
        Ok(manifest)
    }

    fn require_str(&self, path: &Path, key: &str) -> Result<&str> {
        match self.fields.get(key) {
            Some(JsonValue::String(value)) => Ok(value),
            Some(_) => Err(PackageError::manifest_shape(
                path,
                format!("`{key}` must be a string"),
            )),
            None => Err(PackageError::manifest_shape(
                path,
                format!("`{key}` is missing"),
            )),
        }
    }

    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        self.fields
            .get("version")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }

    fn set_version(&mut self, version: String) {
        self.fields
            .insert("version".to_string(), JsonValue::String(version));
    }

    /// Pretty JSON, tab indented, with a trailing newline.
    pub fn to_pretty_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Map<String, Value> serialization into a Vec cannot fail.
        let _ = self.fields.serialize(&mut serializer);
        buf.push(b'\n');
        buf
    }
}

/// Manifest with a stamped version, held in a scratch file that is removed
/// when this value is dropped.
#[derive(Debug)]
pub struct StampedManifest {
    pub manifest: Manifest,
    file: NamedTempFile,
}

impl StampedManifest {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// The version ends up in the archive file name, so it must not carry path
/// separators.
fn ensure_file_name_safe(path: &Path, version: &str) -> Result<()> {
    if version.contains(['/', '\\']) {
        return Err(PackageError::manifest_shape(
            path,
            format!("version `{version}` must not contain path separators"),
        ));
    }
    Ok(())
}

/// Revision for a development build at `now`: the number of 10-second ticks
/// since [`REVISION_TICK_OFFSET`] plus a `-dev` marker.
pub fn generate_revision(now: OffsetDateTime) -> String {
    let ticks = now.unix_timestamp().div_euclid(REVISION_TICK_SECONDS);
    let n = (ticks - REVISION_TICK_OFFSET).max(0);
    format!("{n}-{REVISION_MARKER}")
}

/// Replace the third dot-separated segment of `version` with `revision`.
pub fn stamp_version(version: &str, revision: &str) -> std::result::Result<String, String> {
    let mut segments = version.split('.').collect::<Vec<_>>();
    if segments.len() < 3 {
        return Err(format!(
            "version `{version}` must have at least three dot-separated segments"
        ));
    }
    if segments[..3].iter().any(|segment| segment.is_empty()) {
        return Err(format!("version `{version}` has an empty segment"));
    }
    segments[2] = revision;
    Ok(segments.join("."))
}

/// Read the manifest at `manifest_path`, stamp `revision` (or a generated
/// one) into its version and write the result to a fresh scratch file under
/// `temp_root`. The original file is never modified.
pub fn stamp(
    manifest_path: &Path,
    revision: Option<&str>,
    temp_root: &Path,
) -> Result<StampedManifest> {
    let mut manifest = Manifest::read(manifest_path)?;
    let revision = match revision {
        Some(value) => value.to_string(),
        None => generate_revision(OffsetDateTime::now_utc()),
    };
    let stamped = stamp_version(manifest.version(), &revision)
        .map_err(|message| PackageError::manifest_shape(manifest_path, message))?;
    ensure_file_name_safe(manifest_path, &stamped)?;
    tracing::debug!(from = manifest.version(), to = %stamped, "stamping version");
    manifest.set_version(stamped);

    let mut file = tempfile::Builder::new()
        .prefix("package-")
        .suffix(".json")
        .tempfile_in(temp_root)
        .map_err(|err| {
            PackageError::io(
                format!("failed to create scratch manifest in {}", temp_root.display()),
                err,
            )
        })?;
    let scratch: PathBuf = file.path().to_path_buf();
    file.write_all(&manifest.to_pretty_bytes())
        .and_then(|_| file.flush())
        .map_err(|err| {
            PackageError::io(
                format!("failed to write scratch manifest {}", scratch.display()),
                err,
            )
        })?;

    Ok(StampedManifest { manifest, file })
}
