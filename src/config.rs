use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct PackageToolConfig {
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub staging: StagingSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolsSection {
    #[serde(default)]
    pub tsc: ToolEntry,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolEntry {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StagingSection {
    /// Directory under which staging trees and scratch manifests are created.
    pub temp_dir: Option<PathBuf>,
}

impl PackageToolConfig {
    pub fn temp_root(&self) -> PathBuf {
        self.staging
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

pub fn load(path_override: Option<&Path>) -> Result<PackageToolConfig> {
    let Some(path) = path_override
        .map(Path::to_path_buf)
        .or_else(config_path)
    else {
        return Ok(PackageToolConfig::default());
    };

    if !path.exists() {
        if path_override.is_some() {
            anyhow::bail!("config file {} does not exist", path.display());
        }
        return Ok(PackageToolConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: PackageToolConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn config_path() -> Option<PathBuf> {
    // Prefer the platform config dir, fall back to ~/.package-tool/config.toml.
    if let Some(mut dir) = dirs::config_dir() {
        dir.push("package-tool");
        dir.push("config.toml");
        if dir.exists() {
            return Some(dir);
        }
    }
    dirs::home_dir().map(|mut home| {
        home.push(".package-tool");
        home.push("config.toml");
        home
    })
}
