mod support;

use std::fs;
use std::sync::Arc;

use package_tool::pipeline::{self, PipelineOptions, Variant};
use package_tool::{PackageError, version};
use support::{FakeCompiler, Project, zip_file, zip_files};
use time::OffsetDateTime;

#[tokio::test]
async fn publish_stamps_revision_and_zips_at_root() {
    let project = Project::new("demo", "1.0.0");
    let mut options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());
    options.revision = Some("7".into());

    let report = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .expect("pipeline");

    assert_eq!(report.name, "demo");
    assert_eq!(report.version, "1.0.7");
    assert_eq!(report.archive, project.publish_dir().join("demo-1_0_7.zip"));

    let files = zip_files(&report.archive);
    assert_eq!(zip_file(&files, "index.js"), Some(support::INDEX_JS));
    assert_eq!(zip_file(&files, "README.md"), Some("# demo\n"));
    let manifest: serde_json::Value =
        serde_json::from_str(zip_file(&files, "package.json").expect("package.json")).unwrap();
    assert_eq!(manifest["version"], "1.0.7");
    assert_eq!(manifest["license"], "MIT");

    // The project manifest itself is untouched.
    let original = fs::read_to_string(project.root().join("package.json")).unwrap();
    assert!(original.contains("\"version\":\"1.0.0\""));
    assert!(project.leftovers().is_empty(), "{:?}", project.leftovers());
}

#[tokio::test]
async fn publish_generates_dev_revision_by_default() {
    let project = Project::new("demo", "1.0.0");
    let options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());

    let before = version::generate_revision(OffsetDateTime::now_utc());
    let report = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .expect("pipeline");
    let after = version::generate_revision(OffsetDateTime::now_utc());

    let candidates = [format!("1.0.{before}"), format!("1.0.{after}")];
    assert!(
        candidates.contains(&report.version),
        "{} not in {candidates:?}",
        report.version
    );
    assert!(report.version.ends_with("-dev"));
    let expected = format!("demo-{}.zip", report.version.replace('.', "_"));
    assert_eq!(report.archive, project.publish_dir().join(expected));
}

#[tokio::test]
async fn no_increment_keeps_manifest_version() {
    let project = Project::new("demo", "2.3.4");
    let mut options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());
    options.stamp_revision = false;

    let report = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .expect("pipeline");
    assert_eq!(report.version, "2.3.4");
    assert_eq!(report.archive, project.publish_dir().join("demo-2_3_4.zip"));
}

#[tokio::test]
async fn build_variant_ships_manifest_verbatim_with_dotted_name() {
    let project = Project::new("@acme/widget", "0.4.1");
    project.remove("README.md");
    project.write("src/logo.png", b"png");
    project.write("src/nested/skip.png", b"png");
    let options = PipelineOptions::new(project.root(), Variant::Base, project.temp_root());

    let report = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .expect("pipeline");
    assert_eq!(report.archive, project.publish_dir().join("widget-0.4.1.zip"));

    let files = zip_files(&report.archive);
    let names = files.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["index.js", "logo.png", "package.json"]);
    assert_eq!(
        zip_file(&files, "package.json"),
        Some(fs::read_to_string(project.root().join("package.json")).unwrap().as_str())
    );
}

#[tokio::test]
async fn publish_copies_assets_recursively_and_skips_test_sources() {
    let project = Project::new("demo", "1.0.0");
    project.write("src/icons/app.svg", b"<svg/>");
    project.write("src/data/seed.json", b"{}");
    project.write("src/index.test.ts", b"");
    project.write("src/test/helpers.ts", b"");
    let compiler = Arc::new(FakeCompiler::succeeding());
    let mut options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());
    options.revision = Some("1".into());

    let report = pipeline::run(&options, compiler.clone())
        .await
        .expect("pipeline");

    let calls = compiler.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].files, vec![project.root().join("src/index.ts")]);

    let files = zip_files(&report.archive);
    assert_eq!(zip_file(&files, "icons/app.svg"), Some("<svg/>"));
    assert_eq!(zip_file(&files, "data/seed.json"), Some("{}"));
}

#[tokio::test]
async fn rerun_overwrites_previous_archive() {
    let project = Project::new("demo", "1.0.0");
    let mut options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());
    options.revision = Some("9".into());
    project.write("src/old.png", b"old");

    pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .expect("first run");
    project.remove("src/old.png");
    project.write("src/new.png", b"new");
    let report = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .expect("second run");

    let files = zip_files(&report.archive);
    assert_eq!(zip_file(&files, "new.png"), Some("new"));
    assert_eq!(zip_file(&files, "old.png"), None);
    assert_eq!(fs::read_dir(project.publish_dir()).unwrap().count(), 1);
}

#[tokio::test]
async fn compile_failure_aborts_and_cleans_up() {
    let project = Project::new("demo", "1.0.0");
    let options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());

    let err = pipeline::run(&options, Arc::new(FakeCompiler::failing(2)))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(project.leftovers().is_empty(), "{:?}", project.leftovers());
    assert_eq!(fs::read_dir(project.publish_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_source_dir_fails_before_touching_disk() {
    let project = Project::new("demo", "1.0.0");
    project.remove("src");
    let compiler = Arc::new(FakeCompiler::succeeding());
    let options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());

    let err = pipeline::run(&options, compiler.clone()).await.unwrap_err();
    assert!(
        matches!(err, PackageError::Precondition { what: "source directory", .. }),
        "{err:?}"
    );
    assert_eq!(err.exit_code(), 1);
    assert!(!project.publish_dir().exists());
    assert!(project.leftovers().is_empty());
    assert!(compiler.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn publish_requires_readme() {
    let project = Project::new("demo", "1.0.0");
    project.remove("README.md");
    let options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());

    let err = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .unwrap_err();
    assert!(matches!(err, PackageError::Precondition { what: "readme", .. }));
    assert!(!project.publish_dir().exists());
}

#[tokio::test]
async fn short_version_is_rejected() {
    let project = Project::new("demo", "1.0");
    let options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());

    let err = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .unwrap_err();
    assert!(matches!(err, PackageError::ManifestShape { .. }), "{err:?}");
    assert!(!project.publish_dir().exists());
}

#[tokio::test]
async fn archive_failure_still_removes_staging() {
    let project = Project::new("demo", "1.0.0");
    // A non-empty directory where the archive should go cannot be replaced.
    project.write("publish/demo-1_0_7.zip/keep", b"x");
    let mut options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());
    options.revision = Some("7".into());

    let err = pipeline::run(&options, Arc::new(FakeCompiler::succeeding()))
        .await
        .unwrap_err();
    assert!(matches!(err, PackageError::Archive { .. }), "{err:?}");
    assert_eq!(err.exit_code(), 1);
    assert!(project.leftovers().is_empty(), "{:?}", project.leftovers());
}

#[tokio::test]
async fn version_with_path_separator_is_rejected_before_compiling() {
    let project = Project::new("demo", "1.0.0");
    let compiler = Arc::new(FakeCompiler::succeeding());
    let mut options = PipelineOptions::new(project.root(), Variant::Revisioned, project.temp_root());
    options.revision = Some("x/y".into());

    let err = pipeline::run(&options, compiler.clone()).await.unwrap_err();
    assert!(matches!(err, PackageError::ManifestShape { .. }), "{err:?}");
    assert!(!project.publish_dir().exists());
    assert!(compiler.calls.lock().unwrap().is_empty());
    assert!(project.leftovers().is_empty());
}
