use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::ContentCache;

/// Engine configuration (§6 "Engine configuration"). Construct with
/// [`TransclusionConfig::new`] (which applies the documented defaults) and
/// adjust with the `with_*` builder methods.
#[derive(Clone)]
pub struct TransclusionConfig {
    /// Root of containment; defaults to the current working directory.
    pub base_path: PathBuf,
    /// Ordered candidate extensions, stored without a leading dot.
    pub extensions: Vec<String>,
    /// Mapping used by the variable substituter (§4.2).
    pub variables: HashMap<String, String>,
    /// Treat undefined variables as errors; treat any per-token failure as
    /// fatal in the driver.
    pub strict: bool,
    /// Suppress successful content in output; markers/errors still flow.
    pub validate_only: bool,
    /// Recursion ceiling (§4.6 step 1).
    pub max_depth: u32,
    /// Optional shared content cache.
    pub cache: Option<Arc<dyn ContentCache>>,
    /// Strip a leading YAML/TOML frontmatter block from each loaded file.
    pub strip_frontmatter: bool,
    /// Parent path for the first line, for relative-to-parent resolution.
    pub initial_file_path: Option<PathBuf>,
}

impl Default for TransclusionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransclusionConfig {
    /// Matches the documented defaults: current working directory as base,
    /// `["md", "markdown"]` extensions, no variables, lenient, max depth 10,
    /// no cache, no frontmatter stripping.
    pub fn new() -> Self {
        Self {
            base_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            extensions: vec!["md".to_string(), "markdown".to_string()],
            variables: HashMap::new(),
            strict: false,
            validate_only: false,
            max_depth: 10,
            cache: None,
            strip_frontmatter: false,
            initial_file_path: None,
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ContentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_strip_frontmatter(mut self, strip_frontmatter: bool) -> Self {
        self.strip_frontmatter = strip_frontmatter;
        self
    }

    pub fn with_initial_file_path(mut self, initial_file_path: impl Into<PathBuf>) -> Self {
        self.initial_file_path = Some(initial_file_path.into());
        self
    }
}
