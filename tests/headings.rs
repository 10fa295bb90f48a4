use std::fs;

use tempfile::tempdir;
use transclude_core::{Engine, TransclusionConfig};

#[tokio::test]
async fn single_heading_section_is_extracted() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.md"),
        "## Install\nuse it\n## Next\nmore text",
    )
    .unwrap();

    let mut engine = Engine::new(TransclusionConfig::new().with_base_path(dir.path()));
    let (composed, errors) = engine
        .process_line("![[doc#Install]]".to_string(), 0, Vec::new(), None)
        .await;

    assert_eq!(composed, "## Install\nuse it");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn heading_range_extracts_between_two_headings() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.md"),
        "## A\nbody a\n## B\nbody b\n## C\nbody c",
    )
    .unwrap();

    let mut engine = Engine::new(TransclusionConfig::new().with_base_path(dir.path()));
    let (composed, _) = engine
        .process_line("![[doc#A:C]]".to_string(), 0, Vec::new(), None)
        .await;

    assert_eq!(composed, "## A\nbody a\n## B\nbody b");
}

#[tokio::test]
async fn missing_heading_yields_inline_error_marker() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "## Install\nuse it").unwrap();

    let mut engine = Engine::new(TransclusionConfig::new().with_base_path(dir.path()));
    let (composed, errors) = engine
        .process_line("![[doc#Nope]]".to_string(), 0, Vec::new(), None)
        .await;

    assert_eq!(
        composed,
        "<!-- Error: heading not found: Nope in doc.md -->"
            .replace("doc.md", &dir.path().join("doc.md").display().to_string())
    );
    assert_eq!(errors[0].code, "HEADING_NOT_FOUND");
}

#[tokio::test]
async fn heading_match_is_case_insensitive() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "## Install\nuse it").unwrap();

    let mut engine = Engine::new(TransclusionConfig::new().with_base_path(dir.path()));
    let (composed, errors) = engine
        .process_line("![[doc#install]]".to_string(), 0, Vec::new(), None)
        .await;

    assert_eq!(composed, "## Install\nuse it");
    assert!(errors.is_empty());
}
