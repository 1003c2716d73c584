//! Unit tests for archive extraction.

use super::*;
use crate::artefact::extracted::scan_gallery;
use crate::test_utils::{
    ExpectedCall, StubExecutor, failure_output, success_output_with_stdout, utf8_temp_dir,
    write_zip,
};
use rstest::rstest;

const DESCRIPTOR: &str = "name: Alpha\nversion: 1.0.0\ndescription: Alpha actions\n";
const METADATA: &str =
    r#"{"openapi.json": {"paths": {"/api/actions/alpha/run": {"post": {"summary": "Run alpha"}}}}}"#;

fn config(root: &Utf8Path, env_tool: Option<&str>) -> ExtractConfig {
    ExtractConfig {
        gallery_root: root.join("gallery"),
        env_tool: env_tool.map(str::to_owned),
    }
}

fn alpha_archive(root: &Utf8Path) -> Utf8PathBuf {
    let path = root.join("alpha.zip");
    write_zip(
        &path,
        &[
            ("package.yaml", DESCRIPTOR),
            ("__action_server_metadata__.json", METADATA),
            ("package.png", "PNG"),
            ("README.md", "# Alpha"),
            ("settings.yaml", "x: 1"),
            ("actions.py", "print('hi')"),
            ("src/helpers.json", "{}"),
        ],
    );
    path
}

#[test]
fn extracts_allowlisted_files_and_hashes_archive() {
    let (_temp, root) = utf8_temp_dir();
    let archive = alpha_archive(&root);
    let executor = StubExecutor::new(Vec::new());
    let extractor = ArchiveExtractor::new(config(&root, None), &executor);

    let version = extractor.extract(&archive).expect("archive extracts");

    let dir = root.join("gallery/alpha/1.0.0");
    assert_eq!(version.dir, dir);
    for file in [
        "package.yaml",
        "metadata.json",
        "package.png",
        "README.md",
        "settings.yaml",
        "package.zip",
        "package.hash",
    ] {
        assert!(dir.join(file).is_file(), "{file} should be extracted");
    }
    for file in ["__action_server_metadata__.json", "actions.py", "helpers.json", "src"] {
        assert!(!dir.join(file).exists(), "{file} should not be extracted");
    }

    let bytes = fs::read(&archive).expect("read archive");
    let expected = Sha256Digest::of_bytes(&bytes);
    let written = fs::read_to_string(dir.join("package.hash")).expect("read hash");
    assert_eq!(written, expected.as_str());
    assert_eq!(version.content_hash, expected);
    assert_eq!(fs::read(dir.join("package.zip")).expect("read copy"), bytes);

    assert_eq!(version.actions, ["Run alpha"]);
    assert!(version.readme);
    assert!(version.env_hash.is_none());
}

#[test]
fn captures_environment_hash_from_tool() {
    let (_temp, root) = utf8_temp_dir();
    let archive = alpha_archive(&root);
    let descriptor = root.join("gallery/alpha/1.0.0/package.yaml");
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "rcc",
        &["ht", "hash", descriptor.as_str(), "--silent"],
        Ok(success_output_with_stdout("5f1a9c0e77d2b3a4\n")),
    )]);
    let extractor = ArchiveExtractor::new(config(&root, Some("rcc")), &executor);

    let version = extractor.extract(&archive).expect("archive extracts");

    assert_eq!(version.env_hash.as_deref(), Some("5f1a9c0e77d2b3a4"));
    let written =
        fs::read_to_string(root.join("gallery/alpha/1.0.0/environment.hash")).expect("env hash");
    assert_eq!(written, "5f1a9c0e77d2b3a4");
    executor.assert_finished();
}

#[test]
fn hash_tool_failure_leaves_environment_hash_absent() {
    let (_temp, root) = utf8_temp_dir();
    let archive = alpha_archive(&root);
    let descriptor = root.join("gallery/alpha/1.0.0/package.yaml");
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "rcc",
        &["ht", "hash", descriptor.as_str(), "--silent"],
        Ok(failure_output("conda solve failed")),
    )]);
    let extractor = ArchiveExtractor::new(config(&root, Some("rcc")), &executor);

    let version = extractor.extract(&archive).expect("still extracted");

    assert!(version.env_hash.is_none());
    assert!(!root.join("gallery/alpha/1.0.0/environment.hash").exists());
    assert!(root.join("gallery/alpha/1.0.0/package.hash").is_file());
}

#[test]
fn archive_without_descriptor_is_rejected() {
    let (_temp, root) = utf8_temp_dir();
    let archive = root.join("bare.zip");
    write_zip(&archive, &[("README.md", "# nothing")]);
    let executor = StubExecutor::new(Vec::new());
    let extractor = ArchiveExtractor::new(config(&root, None), &executor);

    let err = extractor.extract(&archive).expect_err("no descriptor");

    assert!(matches!(err, ExtractionError::MissingDescriptor));
    assert!(!root.join("gallery").exists());
}

#[test]
fn reextraction_replaces_stale_files() {
    let (_temp, root) = utf8_temp_dir();
    let archive = alpha_archive(&root);
    let stale = root.join("gallery/alpha/1.0.0/environment.hash");
    fs::create_dir_all(stale.parent().expect("has parent")).expect("mkdir");
    fs::write(&stale, "old").expect("write stale");
    let executor = StubExecutor::new(Vec::new());
    let extractor = ArchiveExtractor::new(config(&root, None), &executor);

    extractor.extract(&archive).expect("archive extracts");

    assert!(!stale.exists());
}

fn named_archive(root: &Utf8Path, file: &str, name: &str) -> Utf8PathBuf {
    let path = root.join(file);
    let descriptor = format!("name: {name}\nversion: 1.0.0\n");
    write_zip(&path, &[("package.yaml", descriptor.as_str())]);
    path
}

#[test]
fn same_package_can_be_extracted_again() {
    let (_temp, root) = utf8_temp_dir();
    let archive = alpha_archive(&root);
    let executor = StubExecutor::new(Vec::new());
    let extractor = ArchiveExtractor::new(config(&root, None), &executor);

    extractor.extract(&archive).expect("first extraction");
    extractor.extract(&archive).expect("second extraction");
}

#[test]
fn colliding_slug_does_not_replace_another_package() {
    let (_temp, root) = utf8_temp_dir();
    let first = named_archive(&root, "first.zip", "Google Mail");
    let second = named_archive(&root, "second.zip", "google_mail");
    let executor = StubExecutor::new(Vec::new());
    let extractor = ArchiveExtractor::new(config(&root, None), &executor);

    extractor.extract(&first).expect("first extraction");
    let err = extractor.extract(&second).expect_err("slug is taken");

    assert!(
        matches!(
            &err,
            ExtractionError::SlugCollision { existing, incoming, .. }
                if existing == "Google Mail" && incoming == "google_mail"
        ),
        "{err}"
    );
    let (versions, failures) = scan_gallery(&root.join("gallery")).expect("scan");
    assert!(failures.is_empty());
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].package.as_str(), "Google Mail");
}

#[test]
fn extract_all_isolates_failures() {
    let (_temp, root) = utf8_temp_dir();
    let good = alpha_archive(&root);
    let corrupt = root.join("corrupt.zip");
    fs::write(&corrupt, b"not a zip").expect("write corrupt");
    let executor = StubExecutor::new(Vec::new());
    let extractor = ArchiveExtractor::new(config(&root, None), &executor);

    let outcome = extractor.extract_all(&[corrupt.clone(), good]);

    assert_eq!(outcome.extracted.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, Stage::Extract);
    assert_eq!(outcome.failures[0].package, corrupt.as_str());
}

#[rstest]
#[case::parent_dir("../escape.txt")]
#[case::nested_parent("foo/../../escape.txt")]
#[case::absolute("/etc/passwd")]
fn rejects_path_traversal(#[case] name: &str) {
    assert!(matches!(
        validate_entry_path(name),
        Err(ExtractionError::PathTraversal { .. })
    ));
}

#[rstest]
#[case::top_level("package.yaml")]
#[case::nested("src/actions.py")]
fn accepts_normal_paths(#[case] name: &str) {
    assert!(validate_entry_path(name).is_ok());
}

#[rstest]
#[case::metadata("__action_server_metadata__.json", Some("metadata.json"))]
#[case::descriptor("package.yaml", Some("package.yaml"))]
#[case::changelog("CHANGELOG.md", Some("CHANGELOG.md"))]
#[case::config("conda.yml", Some("conda.yml"))]
#[case::source("actions.py", None)]
#[case::nested_json("data/extra.json", None)]
#[case::canonical_name("metadata.json", None)]
fn allowlist(#[case] name: &str, #[case] expected: Option<&str>) {
    assert_eq!(allowed_target(name), expected);
}

#[rstest]
#[case::dot_dot("..")]
#[case::dot(".")]
#[case::slash("1.0/evil")]
#[case::empty("")]
fn unsafe_segments_are_rejected(#[case] segment: &str) {
    assert!(matches!(
        check_segment(segment),
        Err(ExtractionError::UnsafeSegment { .. })
    ));
}
