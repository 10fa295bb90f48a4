//! Line Transcluder (§4.6): the engine core that orchestrates security
//! validation, substitution, resolution, reading, heading extraction, and
//! recursive expansion for a single input line, plus the document driver
//! loop that drives it over a whole byte stream.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::cache::ContentCache;
use crate::config::TransclusionConfig;
use crate::error::{TransclusionError, TransclusionErrorRecord};
use crate::heading;
use crate::parser::{self, ReferenceToken};
use crate::reader;
use crate::resolver;
use crate::variables;

/// Per-invocation processing context (§3 "Engine State"). Holds the
/// configuration plus everything that accumulates across one document run:
/// the error list and the set of successfully expanded absolute paths.
pub struct Engine {
    config: TransclusionConfig,
    errors: Vec<TransclusionErrorRecord>,
    processed_files: HashSet<PathBuf>,
}

impl Engine {
    pub fn new(config: TransclusionConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
            processed_files: HashSet::new(),
        }
    }

    pub fn config(&self) -> &TransclusionConfig {
        &self.config
    }

    /// Errors recorded so far, in document-traversal order (§5 "Ordering
    /// guarantees").
    pub fn errors(&self) -> &[TransclusionErrorRecord] {
        &self.errors
    }

    /// Absolute paths whose full (possibly recursive) expansion has
    /// succeeded so far.
    pub fn processed_files(&self) -> &HashSet<PathBuf> {
        &self.processed_files
    }

    /// Process one line (§4.6's public contract). `chain` is the Expansion
    /// Chain for this branch — callers descending recursively must clone it
    /// before extending, never share it with siblings.
    pub fn process_line<'a>(
        &'a mut self,
        line: String,
        depth: u32,
        chain: Vec<PathBuf>,
        context_path: Option<PathBuf>,
    ) -> Pin<Box<dyn Future<Output = (String, Vec<TransclusionErrorRecord>)> + Send + 'a>> {
        Box::pin(async move {
            let mut local_errors = Vec::new();

            // 1. Depth check.
            if depth > self.config.max_depth {
                let err = TransclusionError::MaxDepthExceeded {
                    max_depth: self.config.max_depth,
                    path: display_context(&context_path),
                };
                let record = self.record_error(&err, None);
                local_errors.push(record);
                return (line, local_errors);
            }

            // 2. Parse.
            let tokens = parser::parse_line(&line);
            if tokens.is_empty() {
                return (line, local_errors);
            }

            // 3-8. Resolve, read, extract, recurse, and compose.
            let mut composed = String::with_capacity(line.len());
            let mut cursor = 0usize;

            for token in &tokens {
                composed.push_str(&line[cursor..token.start]);
                cursor = token.end;

                match self
                    .expand_token(token, depth, &chain, context_path.as_deref())
                    .await
                {
                    Ok((expanded, nested_errors)) => {
                        composed.push_str(&expanded);
                        local_errors.extend(nested_errors);
                    }
                    Err(err) => {
                        let marker = if err.is_missing() {
                            format!("<!-- Missing: {} -->", token.path)
                        } else {
                            format!("<!-- Error: {err} -->")
                        };
                        let record = self.record_error(&err, None);
                        local_errors.push(record);
                        composed.push_str(&marker);
                    }
                }
            }
            composed.push_str(&line[cursor..]);

            (composed, local_errors)
        })
    }

    /// Resolve, read, extract, and (if needed) recursively expand a single
    /// token's target (§4.6 steps 3-7). The `Ok` side carries along any
    /// errors recorded deeper in the recursion, so a top-level caller's
    /// returned error list reflects this token's whole expansion, not just
    /// its own immediate outcome.
    async fn expand_token(
        &mut self,
        token: &ReferenceToken,
        depth: u32,
        chain: &[PathBuf],
        context_path: Option<&Path>,
    ) -> Result<(String, Vec<TransclusionErrorRecord>), TransclusionError> {
        let substituted = variables::substitute(&token.path, &self.config.variables, self.config.strict)?;

        let resolution = resolver::resolve(
            &substituted,
            &self.config.base_path,
            context_path.and_then(Path::parent),
            &self.config.extensions,
        );
        if !resolution.exists {
            return Err(resolution
                .error
                .unwrap_or(TransclusionError::FileNotFound { path: substituted }));
        }
        let absolute_path = resolution.absolute_path;

        if chain.contains(&absolute_path) {
            let mut display_chain: Vec<String> =
                chain.iter().map(|p| p.display().to_string()).collect();
            display_chain.push(absolute_path.display().to_string());
            return Err(TransclusionError::CircularReference {
                chain: display_chain.join(" → "),
            });
        }

        let cache_ref: Option<&dyn ContentCache> = self.config.cache.as_deref();
        let content = reader::read_file(&absolute_path, cache_ref, self.config.strip_frontmatter).await?;

        let content = match &token.heading {
            Some(heading_spec) => {
                heading::extract(&content, heading_spec, &absolute_path.display().to_string())?
            }
            None => content,
        };

        let (expanded, nested_errors) = if content.contains("![[") {
            // Checked here, before descending, so a ceiling hit fails just
            // this token (composed as its own inline marker one level up)
            // rather than the line-unchanged fallback inside `process_line`
            // ever being reached through our own recursion.
            if depth + 1 > self.config.max_depth {
                return Err(TransclusionError::MaxDepthExceeded {
                    max_depth: self.config.max_depth,
                    path: absolute_path.display().to_string(),
                });
            }

            let mut descended_chain = chain.to_vec();
            descended_chain.push(absolute_path.clone());

            let mut out_lines = Vec::new();
            let mut nested_errors = Vec::new();
            for sub_line in content.lines() {
                let (composed, sub_errors) = self
                    .process_line(
                        sub_line.to_string(),
                        depth + 1,
                        descended_chain.clone(),
                        Some(absolute_path.clone()),
                    )
                    .await;
                out_lines.push(composed);
                nested_errors.extend(sub_errors);
            }
            (out_lines.join("\n").trim().to_string(), nested_errors)
        } else {
            (content, Vec::new())
        };

        self.processed_files.insert(absolute_path);

        Ok((expanded, nested_errors))
    }

    fn record_error(&mut self, err: &TransclusionError, line: Option<u64>) -> TransclusionErrorRecord {
        let record = err.to_record(line);
        tracing::warn!(code = %record.code, path = %record.path, "transclusion error recorded");
        self.errors.push(record.clone());
        record
    }

    /// Drive a whole document: split the input on `\n`/`\r\n` boundaries
    /// (including a final line with no trailing newline), process each line,
    /// and write `\n`-terminated output. In `validate_only` mode, successful
    /// content is not written, but markers and errors still flow.
    pub async fn process_document<R, W>(
        &mut self,
        input: R,
        mut output: W,
        cancellation: Option<&CancellationToken>,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let context_path = self.config.initial_file_path.clone();
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if cancellation.is_some_and(|token| token.is_cancelled()) {
                break;
            }

            let (composed, _) = self
                .process_line(line, 0, Vec::new(), context_path.clone())
                .await;

            if !self.config.validate_only {
                output.write_all(composed.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }

        output.flush().await
    }
}

fn display_context(context_path: &Option<PathBuf>) -> String {
    context_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransclusionConfig;
    use std::fs;
    use tempfile::tempdir;

    fn engine_with_base(base: &Path) -> Engine {
        Engine::new(TransclusionConfig::new().with_base_path(base))
    }

    #[tokio::test]
    async fn simple_expansion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.md"), "X").unwrap();

        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line("hello ![[x]] world".to_string(), 0, Vec::new(), None)
            .await;

        assert_eq!(composed, "hello X world");
        assert!(errors.is_empty());
        assert!(engine
            .processed_files()
            .contains(&dir.path().join("x.md")));
    }

    #[tokio::test]
    async fn recursive_expansion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "A ![[b]]").unwrap();
        fs::write(dir.path().join("b.md"), "B ![[c]]").unwrap();
        fs::write(dir.path().join("c.md"), "C").unwrap();

        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line("![[a]]".to_string(), 0, Vec::new(), None)
            .await;

        assert_eq!(composed, "A B C");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn circular_reference_is_detected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "![[b]]").unwrap();
        fs::write(dir.path().join("b.md"), "![[a]]").unwrap();

        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line("![[a]]".to_string(), 0, Vec::new(), None)
            .await;

        assert!(composed.contains("<!-- Error: Circular reference detected:"));
        assert_eq!(errors.last().unwrap().code, "CIRCULAR_REFERENCE");
    }

    #[tokio::test]
    async fn depth_ceiling_is_enforced() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f1.md"), "1 ![[f2]]").unwrap();
        fs::write(dir.path().join("f2.md"), "2 ![[f3]]").unwrap();
        fs::write(dir.path().join("f3.md"), "3 ![[f4]]").unwrap();
        fs::write(dir.path().join("f4.md"), "4 ![[f5]]").unwrap();
        fs::write(dir.path().join("f5.md"), "5").unwrap();

        let mut engine = Engine::new(
            TransclusionConfig::new()
                .with_base_path(dir.path())
                .with_max_depth(3),
        );
        let (composed, errors) = engine
            .process_line("![[f1]]".to_string(), 0, Vec::new(), None)
            .await;

        assert!(composed.contains("<!-- Error: Maximum transclusion depth (3) exceeded -->"));
        assert!(errors.iter().any(|e| e.code == "MAX_DEPTH_EXCEEDED"));
    }

    #[tokio::test]
    async fn sibling_in_subdirectory_resolves_relative_to_parent_file() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a.md"), "A ![[sibling]]").unwrap();
        fs::write(sub.join("sibling.md"), "SIBLING").unwrap();

        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line(
                "![[sub/a]]".to_string(),
                0,
                Vec::new(),
                None,
            )
            .await;

        assert_eq!(composed, "A SIBLING");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn heading_extraction() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("doc.md"), "## Install\nuse it\n## Next\nmore").unwrap();

        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line("![[doc#Install]]".to_string(), 0, Vec::new(), None)
            .await;

        assert_eq!(composed, "## Install\nuse it");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn path_traversal_is_blocked() {
        let dir = tempdir().unwrap();
        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line("![[../../../etc/passwd]]".to_string(), 0, Vec::new(), None)
            .await;

        assert!(composed.contains("<!-- Missing: ../../../etc/passwd -->"));
        assert!(matches!(
            errors.last().unwrap().code.as_str(),
            "OUTSIDE_BASE" | "FILE_NOT_FOUND"
        ));
    }

    #[tokio::test]
    async fn masked_reference_is_preserved_verbatim() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.md"), "X").unwrap();

        let mut engine = engine_with_base(dir.path());
        let input = "see `![[x]]` here";
        let (composed, errors) = engine
            .process_line(input.to_string(), 0, Vec::new(), None)
            .await;

        assert_eq!(composed, input);
        assert!(errors.is_empty());
        assert!(engine.processed_files().is_empty());
    }

    #[tokio::test]
    async fn variable_substitution() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes-es.md"), "ES").unwrap();

        let mut variables = std::collections::HashMap::new();
        variables.insert("lang".to_string(), "es".to_string());

        let mut engine = Engine::new(
            TransclusionConfig::new()
                .with_base_path(dir.path())
                .with_variables(variables),
        );
        let (composed, errors) = engine
            .process_line("![[notes-{{lang}}]]".to_string(), 0, Vec::new(), None)
            .await;

        assert_eq!(composed, "ES");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn undefined_variable_is_left_literal_in_lenient_mode() {
        let dir = tempdir().unwrap();
        let mut engine = engine_with_base(dir.path());
        let (composed, errors) = engine
            .process_line("![[notes-{{lang}}]]".to_string(), 0, Vec::new(), None)
            .await;

        assert!(composed.contains("<!-- Missing: notes-{{lang}} -->"));
        assert_eq!(errors.last().unwrap().code, "FILE_NOT_FOUND");
    }

    #[tokio::test]
    async fn process_document_writes_newline_terminated_output() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.md"), "X").unwrap();

        let mut engine = engine_with_base(dir.path());
        let input = tokio::io::BufReader::new("hello ![[x]] world".as_bytes());
        let mut output = Vec::new();
        engine
            .process_document(input, &mut output, None)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "hello X world\n");
    }

    #[tokio::test]
    async fn validate_only_suppresses_content_but_keeps_errors() {
        let dir = tempdir().unwrap();
        let mut engine = Engine::new(
            TransclusionConfig::new()
                .with_base_path(dir.path())
                .with_validate_only(true),
        );
        let input = tokio::io::BufReader::new("![[missing]]".as_bytes());
        let mut output = Vec::new();
        engine
            .process_document(input, &mut output, None)
            .await
            .unwrap();

        assert!(output.is_empty());
        assert_eq!(engine.errors().len(), 1);
    }
}
