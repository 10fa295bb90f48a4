//! Path-Security Validator (§4.1).
//!
//! Rejects unsafe reference strings before any file-system call, then checks
//! that a resolved candidate path stays lexically inside the base directory.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::error::TransclusionError;

/// Reject null bytes, absolute paths, UNC paths, and encoded traversal
/// variants in a raw (pre-resolution) reference string.
pub fn validate_reference(reference: &str) -> Result<(), TransclusionError> {
    if reference.contains('\0') {
        return Err(TransclusionError::NullByte {
            path: reference.to_string(),
        });
    }

    if is_absolute_reference(reference) {
        return Err(TransclusionError::AbsolutePath {
            path: reference.to_string(),
        });
    }

    // URL-decode and re-check: a reference that only becomes absolute after
    // decoding (e.g. "%2Fetc%2Fpasswd") is a traversal attempt, not a
    // legitimate absolute path.
    if let Ok(decoded) = percent_decode_str(reference).decode_utf8() {
        if decoded != reference && is_absolute_reference(&decoded) {
            return Err(TransclusionError::PathTraversal {
                path: reference.to_string(),
            });
        }
    }

    Ok(())
}

/// POSIX absolute, Windows drive-letter root (`X:\`, `X:/`), or UNC
/// (`\\`, `//`) prefixes all count as "absolute" for our purposes — `..`
/// segments alone are not rejected here (§4.1).
fn is_absolute_reference(reference: &str) -> bool {
    if Path::new(reference).is_absolute() {
        return true;
    }
    if reference.starts_with("\\\\") || reference.starts_with("//") {
        return true;
    }
    let bytes = reference.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() == 2 {
            return true;
        }
        return matches!(bytes[2], b'\\' | b'/');
    }
    false
}

/// Lexically normalise a path: resolve `.` and `..` components without
/// touching the filesystem (the candidate may not exist yet). A leading
/// `..` that would escape the root is left as a literal `..` component so
/// containment checking still rejects it.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match out.components().next_back() {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    _ => out.push(Component::ParentDir.as_os_str()),
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Containment check: the (lexically normalised) candidate must equal the
/// (lexically normalised) base, or begin with `base + separator`.
pub fn ensure_contained(candidate: &Path, base: &Path) -> Result<PathBuf, TransclusionError> {
    let normalized_candidate = normalize_lexically(candidate);
    let normalized_base = normalize_lexically(base);

    if normalized_candidate == normalized_base || normalized_candidate.starts_with(&normalized_base)
    {
        Ok(normalized_candidate)
    } else {
        Err(TransclusionError::OutsideBase {
            path: candidate.display().to_string(),
        })
    }
}
