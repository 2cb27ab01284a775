#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use package_tool::PackageError;
use package_tool::compiler::{CompileRequest, Compiler};
use tempfile::TempDir;
use zip::ZipArchive;

pub const INDEX_TS: &str = "export function hello(): string {\n    return \"hi\";\n}\n";
pub const INDEX_JS: &str = "exports.hello = function () { return \"hi\"; };\n";

/// A throwaway project folder plus a private temp root for staging.
pub struct Project {
    dir: TempDir,
    temp: TempDir,
}

impl Project {
    pub fn new(name: &str, version: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("package-tool-project")
            .tempdir()
            .expect("project tempdir");
        let temp = TempDir::new().expect("temp root");
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/index.ts"), INDEX_TS).unwrap();
        fs::write(
            root.join("package.json"),
            format!("{{\"name\":\"{name}\",\"version\":\"{version}\",\"license\":\"MIT\"}}"),
        )
        .unwrap();
        fs::write(root.join("README.md"), format!("# {name}\n")).unwrap();
        Self { dir, temp }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn temp_root(&self) -> &Path {
        self.temp.path()
    }

    pub fn write(&self, relative: &str, contents: &[u8]) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn remove(&self, relative: &str) {
        let path = self.root().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }

    pub fn publish_dir(&self) -> PathBuf {
        self.root().join("publish")
    }

    /// Entries left in the temp root; empty once a run has cleaned up.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        fs::read_dir(self.temp_root())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// Stands in for `tsc`: emits `<stem>.js` for every source, or fails.
pub struct FakeCompiler {
    pub exit_code: Option<i32>,
    pub calls: Mutex<Vec<CompileRequest>>,
}

impl FakeCompiler {
    pub fn succeeding() -> Self {
        Self {
            exit_code: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn compile(&self, request: &CompileRequest) -> package_tool::Result<()> {
        self.calls
            .lock()
            .expect("mutex poisoned")
            .push(request.clone());
        if let Some(code) = self.exit_code {
            return Err(PackageError::CompileFailure {
                code,
                message: "fake compiler failed".into(),
            });
        }
        for file in &request.files {
            let relative = file
                .strip_prefix(&request.root_dir)
                .expect("source under root dir");
            let out = request.out_dir.join(relative).with_extension("js");
            fs::create_dir_all(out.parent().unwrap()).unwrap();
            fs::write(out, INDEX_JS).unwrap();
        }
        Ok(())
    }
}

/// `(name, contents)` for every file entry of a zip, in archive order.
pub fn zip_files(path: &Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).expect("open archive")).expect("zip");
    let mut out = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).unwrap();
        if !entry.is_file() {
            continue;
        }
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        out.push((entry.name().to_string(), body));
    }
    out
}

pub fn zip_file<'a>(files: &'a [(String, String)], name: &str) -> Option<&'a str> {
    files
        .iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, body)| body.as_str())
}

/// Shell script that behaves like a successful `tsc` run: writes
/// `index.js` into the `--outDir` it is given.
#[cfg(unix)]
pub fn fake_tsc_script(dir: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-tsc");
    let script = format!(
        r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outDir) out="$2"; shift 2 ;;
    --rootDir) shift 2 ;;
    *) shift ;;
  esac
done
if [ {exit_code} -ne 0 ]; then
  echo "fake-tsc: error TS2322" >&2
  exit {exit_code}
fi
printf '%s' '{INDEX_JS}' > "$out/index.js"
"#
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
