//! Path Resolver (§4.3): turns a (post-substitution) reference string into
//! an absolute, contained path, trying candidate extensions in order across
//! the parent-directory and base-directory search bases.

use std::path::{Path, PathBuf};

use crate::error::TransclusionError;
use crate::security::{ensure_contained, normalize_lexically, validate_reference};

/// Outcome of resolving a reference path (§3 "Resolution").
#[derive(Debug, Clone)]
pub struct Resolution {
    pub absolute_path: PathBuf,
    pub exists: bool,
    pub original_reference: String,
    pub error: Option<TransclusionError>,
}

impl Resolution {
    pub fn found(absolute_path: PathBuf, original_reference: String) -> Self {
        Self {
            absolute_path,
            exists: true,
            original_reference,
            error: None,
        }
    }

    pub fn failed(
        absolute_path: PathBuf,
        original_reference: String,
        error: TransclusionError,
    ) -> Self {
        Self {
            absolute_path,
            exists: false,
            original_reference,
            error: Some(error),
        }
    }
}

/// Candidate forms to try for a reference without regard to search base:
/// the reference as-is if it already carries an extension, otherwise the
/// reference as-is followed by the reference with each configured extension
/// appended, in order.
fn candidate_forms(reference: &str, extensions: &[String]) -> Vec<String> {
    if Path::new(reference).extension().is_some() {
        return vec![reference.to_string()];
    }

    let mut forms = Vec::with_capacity(1 + extensions.len());
    forms.push(reference.to_string());
    for ext in extensions {
        let dotted = ext.strip_prefix('.').unwrap_or(ext);
        forms.push(format!("{reference}.{dotted}"));
    }
    forms
}

/// Resolve `reference` against `base_dir`, optionally preferring
/// `parent_dir` (the directory of the file currently being expanded) as the
/// first search base for relative references.
pub fn resolve(
    reference: &str,
    base_dir: &Path,
    parent_dir: Option<&Path>,
    extensions: &[String],
) -> Resolution {
    if let Err(err) = validate_reference(reference) {
        let canonical = normalize_lexically(&base_dir.join(reference));
        return Resolution::failed(canonical, reference.to_string(), err);
    }

    let forms = candidate_forms(reference, extensions);
    let is_relative = !Path::new(reference).is_absolute();

    let mut search_bases: Vec<&Path> = Vec::with_capacity(2);
    if is_relative {
        if let Some(parent) = parent_dir {
            search_bases.push(parent);
        }
    }
    search_bases.push(base_dir);

    let mut remembered_security_error: Option<TransclusionError> = None;

    for search_base in &search_bases {
        for form in &forms {
            let joined = search_base.join(form);
            let normalized = normalize_lexically(&joined);

            match ensure_contained(&normalized, base_dir) {
                Ok(contained) => {
                    if contained.is_file() {
                        return Resolution::found(contained, reference.to_string());
                    }
                }
                Err(err) => {
                    if remembered_security_error.is_none() {
                        remembered_security_error = Some(err);
                    }
                }
            }
        }
    }

    if let Some(security_error) = remembered_security_error {
        let canonical = normalize_lexically(&search_bases[0].join(&forms[0]));
        return Resolution::failed(canonical, reference.to_string(), security_error);
    }

    let canonical = normalize_lexically(&search_bases[0].join(&forms[0]));
    let not_found = TransclusionError::FileNotFound {
        path: reference.to_string(),
    };
    Resolution::failed(canonical, reference.to_string(), not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn exts() -> Vec<String> {
        vec!["md".to_string(), "markdown".to_string()]
    }

    #[test]
    fn resolves_exact_match_in_base() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.md"), "X").unwrap();

        let res = resolve("x", dir.path(), None, &exts());
        assert!(res.exists);
        assert_eq!(res.absolute_path, dir.path().join("x.md"));
    }

    #[test]
    fn tries_extensions_in_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.markdown"), "X").unwrap();

        let res = resolve("x", dir.path(), None, &exts());
        assert!(res.exists);
        assert_eq!(res.absolute_path, dir.path().join("x.markdown"));
    }

    #[test]
    fn reference_with_extension_is_tried_exactly() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.txt"), "X").unwrap();

        let res = resolve("x.txt", dir.path(), None, &exts());
        assert!(res.exists);
        assert_eq!(res.absolute_path, dir.path().join("x.txt"));
    }

    #[test]
    fn prefers_parent_dir_over_base_dir() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("x.md"), "BASE").unwrap();
        fs::write(sub.join("x.md"), "PARENT").unwrap();

        let res = resolve("x", dir.path(), Some(&sub), &exts());
        assert!(res.exists);
        assert_eq!(res.absolute_path, sub.join("x.md"));
    }

    #[test]
    fn missing_file_reports_file_not_found() {
        let dir = tempdir().unwrap();
        let res = resolve("nope", dir.path(), None, &exts());
        assert!(!res.exists);
        assert_eq!(res.error.unwrap().code().as_str(), "FILE_NOT_FOUND");
    }

    #[test]
    fn traversal_outside_base_reports_security_error_not_file_not_found() {
        let dir = tempdir().unwrap();
        let res = resolve("../../etc/passwd", dir.path(), None, &exts());
        assert!(!res.exists);
        assert_eq!(res.error.unwrap().code().as_str(), "OUTSIDE_BASE");
    }

    #[test]
    fn absolute_reference_is_rejected_before_any_filesystem_check() {
        let dir = tempdir().unwrap();
        let res = resolve("/etc/passwd", dir.path(), None, &exts());
        assert!(!res.exists);
        assert_eq!(res.error.unwrap().code().as_str(), "ABSOLUTE_PATH");
    }

    #[test]
    fn null_byte_reference_is_rejected() {
        let dir = tempdir().unwrap();
        let res = resolve("foo\0bar", dir.path(), None, &exts());
        assert!(!res.exists);
        assert_eq!(res.error.unwrap().code().as_str(), "NULL_BYTE");
    }
}
