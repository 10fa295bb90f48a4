//! Reference Parser (§4.5): masks inline code spans and HTML comments, then
//! scans a single line for `![[...]]` occurrences.

/// One parsed `![[...]]` occurrence on a line (§3 "Reference Token").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    /// The verbatim slice of the line, including `![[` and `]]`.
    pub original: String,
    /// The trimmed path portion, before variable substitution.
    pub path: String,
    /// The trimmed heading portion, if `#heading` was present.
    pub heading: Option<String>,
    /// Half-open byte-offset range `[start, end)` into the source line.
    pub start: usize,
    pub end: usize,
}

/// Scan `line` for surviving `![[...]]` tokens, left to right, skipping any
/// occurrence whose opening `![[` falls inside a masked region (inline code
/// or an HTML comment).
pub fn parse_line(line: &str) -> Vec<ReferenceToken> {
    let mask = build_mask(line);
    let mut tokens = Vec::new();
    let mut search_from = 0usize;

    while let Some(rel_start) = line[search_from..].find("![[") {
        let start = search_from + rel_start;
        let body_start = start + "![[".len();

        let Some(rel_close) = line[body_start..].find("]]") else {
            // No closing delimiter anywhere after this opening — nothing
            // here can match, but a later "![[" further on might still.
            search_from = body_start;
            continue;
        };
        let close = body_start + rel_close;
        let end = close + "]]".len();

        if !mask[start] {
            search_from = start + 1;
            continue;
        }

        let body = &line[body_start..close];
        if body.trim().is_empty() {
            search_from = end;
            continue;
        }

        let (path_part, heading_part) = match body.find('#') {
            Some(idx) => (&body[..idx], Some(&body[idx + '#'.len_utf8()..])),
            None => (body, None),
        };
        let path = path_part.trim().to_string();

        if path.is_empty() {
            search_from = end;
            continue;
        }

        let heading = heading_part.map(|h| h.trim().to_string());

        tokens.push(ReferenceToken {
            original: line[start..end].to_string(),
            path,
            heading,
            start,
            end,
        });
        search_from = end;
    }

    tokens
}

/// Build a byte-indexed eligibility mask: `true` means "not inside a masked
/// region". `mask.len() == line.len()` (byte length).
fn build_mask(line: &str) -> Vec<bool> {
    let mut mask = vec![true; line.len()];
    mask_code_spans(line, &mut mask);
    mask_html_comments(line, &mut mask);
    mask
}

/// Inline code spans: pair up backticks sequentially (1st opens, 2nd
/// closes, 3rd opens, ...); an unmatched trailing backtick masks nothing.
fn mask_code_spans(line: &str, mask: &mut [bool]) {
    let ticks: Vec<usize> = line
        .char_indices()
        .filter(|&(_, c)| c == '`')
        .map(|(i, _)| i)
        .collect();

    for pair in ticks.chunks_exact(2) {
        let (open, close) = (pair[0], pair[1]);
        for slot in mask.iter_mut().take(close + 1).skip(open) {
            *slot = false;
        }
    }
}

/// HTML comments: `<!--` to the next `-->`, or to end of line if
/// unterminated.
fn mask_html_comments(line: &str, mask: &mut [bool]) {
    let mut cursor = 0usize;
    while let Some(rel_open) = line[cursor..].find("<!--") {
        let open = cursor + rel_open;
        let search_from = open + "<!--".len();
        let close_end = match line[search_from..].find("-->") {
            Some(rel_close) => search_from + rel_close + "-->".len(),
            None => line.len(),
        };
        for slot in mask.iter_mut().take(close_end).skip(open) {
            *slot = false;
        }
        cursor = close_end;
        if cursor >= line.len() {
            break;
        }
    }
}
