//! Heading-scoped extraction (§4.6 step 5): pulls a named section, or a
//! `H1:H2` range, out of loaded file content.

use crate::error::TransclusionError;

/// If `line` is a Markdown heading (`#` through `######`, a space, then
/// text), return its level (1-6) and trimmed text.
fn parse_heading_line(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !(rest.starts_with(' ') || rest.is_empty()) {
        return None;
    }
    Some((hashes as u8, rest.trim()))
}

fn find_heading_line(lines: &[&str], text: &str) -> Option<usize> {
    lines
        .iter()
        .position(|line| matches!(parse_heading_line(line), Some((_, t)) if t.eq_ignore_ascii_case(text)))
}

/// Drop trailing blank/whitespace-only lines from a section.
fn trim_trailing_blank(mut lines: Vec<&str>) -> Vec<&str> {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}

/// Extract the section for `heading_spec`, which is either a single heading
/// name or a `H1:H2` range (§4.6 step 5).
pub fn extract(content: &str, heading_spec: &str, path: &str) -> Result<String, TransclusionError> {
    if let Some(colon_idx) = heading_spec.find(':') {
        let h1 = heading_spec[..colon_idx].trim();
        let h2 = heading_spec[colon_idx + 1..].trim();
        extract_range(content, h1, h2, path)
    } else {
        extract_single(content, heading_spec, path)
    }
}

fn extract_single(content: &str, heading: &str, path: &str) -> Result<String, TransclusionError> {
    let lines: Vec<&str> = content.lines().collect();
    let heading = heading.trim();

    let Some(start_idx) = find_heading_line(&lines, heading) else {
        return Err(TransclusionError::HeadingNotFound {
            heading: heading.to_string(),
            path: path.to_string(),
        });
    };
    let (level, _) = parse_heading_line(lines[start_idx]).expect("index came from a match");

    let mut end_idx = lines.len();
    for (offset, line) in lines[start_idx + 1..].iter().enumerate() {
        if let Some((lvl, _)) = parse_heading_line(line) {
            if lvl <= level {
                end_idx = start_idx + 1 + offset;
                break;
            }
        }
    }

    let section = trim_trailing_blank(lines[start_idx..end_idx].to_vec());
    Ok(section.join("\n"))
}

fn extract_range(
    content: &str,
    h1: &str,
    h2: &str,
    path: &str,
) -> Result<String, TransclusionError> {
    let lines: Vec<&str> = content.lines().collect();

    let start_idx = if h1.is_empty() {
        0
    } else {
        find_heading_line(&lines, h1).ok_or_else(|| TransclusionError::HeadingNotFound {
            heading: h1.to_string(),
            path: path.to_string(),
        })?
    };

    let end_idx = if h2.is_empty() {
        lines.len()
    } else {
        find_heading_line(&lines, h2)
            .filter(|idx| *idx > start_idx)
            .unwrap_or(lines.len())
    };

    let section = trim_trailing_blank(lines[start_idx..end_idx.max(start_idx)].to_vec());
    Ok(section.join("\n"))
}
