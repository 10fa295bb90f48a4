//! File Reader with Optional Cache (§4.4).

use std::path::Path;

use crate::cache::{CachedContent, ContentCache};
use crate::error::TransclusionError;

/// Maximum single-file size the reader will load: 1 MiB (§4.4).
pub const MAX_FILE_SIZE: usize = 1024 * 1024;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Decode raw bytes as UTF-8 (or UTF-16 when a BOM says so) and strip the
/// BOM itself. Returns `BinaryFile` if the decoded text contains a NUL byte.
fn decode_and_strip_bom(bytes: &[u8], path: &str) -> Result<String, TransclusionError> {
    let text = if bytes.starts_with(&UTF8_BOM) {
        String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).map_err(|_| {
            TransclusionError::ReadError {
                path: path.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "invalid UTF-8 after BOM",
                ),
            }
        })?
    } else if bytes.starts_with(&UTF16_BE_BOM) {
        decode_utf16_bytes(&bytes[UTF16_BE_BOM.len()..], false, path)?
    } else if bytes.starts_with(&UTF16_LE_BOM) {
        decode_utf16_bytes(&bytes[UTF16_LE_BOM.len()..], true, path)?
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|_| TransclusionError::ReadError {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid UTF-8"),
        })?
    };

    if text.contains('\0') {
        return Err(TransclusionError::BinaryFile {
            path: path.to_string(),
        });
    }

    Ok(text)
}

fn decode_utf16_bytes(bytes: &[u8], little_endian: bool, path: &str) -> Result<String, TransclusionError> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| TransclusionError::ReadError {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid UTF-16"),
        })
}

/// Strip a single leading frontmatter block (`---`/`---` YAML or
/// `+++`/`+++` TOML) when it opens on the first line and has a matching
/// closing delimiter. Malformed (unterminated) frontmatter is left intact,
/// per §9's ordering rule this must run before heading extraction.
pub fn strip_frontmatter(content: &str) -> &str {
    for delimiter in ["---", "+++"] {
        let Some(rest) = content.strip_prefix(delimiter) else {
            continue;
        };
        // The opening delimiter must be alone on the first line.
        let after_marker = match rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
            Some(rest) => rest,
            None => continue,
        };

        if let Some(close_at) = find_closing_delimiter(after_marker, delimiter) {
            return &after_marker[close_at..];
        }
    }
    content
}

/// Find the byte offset just past the closing delimiter line (including its
/// trailing newline, if any), searching line by line.
fn find_closing_delimiter(body: &str, delimiter: &str) -> Option<usize> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == delimiter {
            return Some(offset + line.len());
        }
        offset += line.len();
    }
    None
}

/// Read a file from disk (or cache) applying BOM stripping, binary
/// detection, the size cap, and optional frontmatter stripping, in that
/// order (§4.4, §9).
pub async fn read_file(
    path: &Path,
    cache: Option<&dyn ContentCache>,
    strip_frontmatter_enabled: bool,
) -> Result<String, TransclusionError> {
    let path_str = path.display().to_string();

    let bom_stripped = match cache.and_then(|c| c.get(path)) {
        Some(cached) => {
            tracing::debug!(path = %path_str, "transclusion cache hit");
            cached.content
        }
        None => {
            tracing::debug!(path = %path_str, "transclusion cache miss, reading from disk");
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|source| TransclusionError::ReadError {
                    path: path_str.clone(),
                    source,
                })?;

            if !metadata.is_file() {
                return Err(TransclusionError::NotAFile {
                    path: path_str.clone(),
                });
            }

            if metadata.len() > MAX_FILE_SIZE as u64 {
                return Err(TransclusionError::FileTooLarge {
                    path: path_str.clone(),
                    size: metadata.len(),
                    max: MAX_FILE_SIZE as u64,
                });
            }

            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| TransclusionError::ReadError {
                    path: path_str.clone(),
                    source,
                })?;

            let text = decode_and_strip_bom(&bytes, &path_str)?;

            tracing::debug!(path = %path_str, size = text.len(), "transclusion file read");

            if let Some(cache) = cache {
                cache.set(path.to_path_buf(), CachedContent::new(text.clone()));
            }

            text
        }
    };

    if strip_frontmatter_enabled {
        Ok(strip_frontmatter(&bom_stripped).to_string())
    } else {
        Ok(bom_stripped)
    }
}
