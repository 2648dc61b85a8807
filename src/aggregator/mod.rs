//! Folder aggregator for per-directory `data.json` files.
//!
//! Walks a directory tree and builds one nested JSON object mirroring the
//! folder hierarchy, merging each folder's `data.json` into its node.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names pruned from the walk at every depth.
pub const IGNORED_DIRS: &[&str] = &[".venv", ".vscode", "__pycache__"];

/// File name holding a folder's answer-key payload.
pub const DATA_FILE: &str = "data.json";

/// Configuration for the aggregation walk.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Directory names to prune (applies at all depths).
    pub ignored_dirs: Vec<String>,
    /// Per-folder data file name.
    pub data_file: String,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            data_file: DATA_FILE.to_string(),
        }
    }
}

impl From<&crate::config::AggregatorConfig> for AggregateConfig {
    fn from(config: &crate::config::AggregatorConfig) -> Self {
        Self {
            ignored_dirs: config.ignored_dirs.clone(),
            data_file: config.data_file.clone(),
        }
    }
}

/// Aggregates a directory tree into one nested JSON object.
pub struct FolderAggregator {
    root: PathBuf,
    config: AggregateConfig,
}

impl FolderAggregator {
    /// Create an aggregator rooted at the given directory.
    pub fn new(root: PathBuf, config: AggregateConfig) -> Self {
        Self { root, config }
    }

    /// Walk the tree and build the aggregated object.
    ///
    /// Never fails: unreadable directories and malformed or unreadable
    /// data files are logged and skipped. A missing root yields an empty
    /// object.
    pub fn aggregate(&self) -> Map<String, Value> {
        let mut tree = Map::new();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            self.visit_dir(entry.path(), &mut tree);
        }

        tree
    }

    /// Process one directory: create its node, then merge its data file.
    fn visit_dir(&self, dir: &Path, tree: &mut Map<String, Value>) {
        let node = match self.node_for(dir, tree) {
            Some(node) => node,
            None => return,
        };

        let data_path = dir.join(&self.config.data_file);
        if data_path.is_file() {
            merge_data_file(&data_path, node);
        }
    }

    /// Walk or create the node chain for a directory's path relative to
    /// the root, returning the directory's own node.
    ///
    /// Returns `None` when a segment's slot already holds a non-object
    /// value merged from a data file; the file-derived value is kept and
    /// the directory contributes no node.
    fn node_for<'a>(
        &self,
        dir: &Path,
        tree: &'a mut Map<String, Value>,
    ) -> Option<&'a mut Map<String, Value>> {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);

        let mut node = tree;
        for component in relative.components() {
            let segment = component.as_os_str().to_string_lossy().into_owned();

            let child = node
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));

            node = match child.as_object_mut() {
                Some(map) => map,
                None => {
                    warn!(
                        "Folder {} collides with a data value; keeping the data value",
                        dir.display()
                    );
                    return None;
                }
            };
        }

        Some(node)
    }

    /// Whether an entry is a pruned directory. The root itself is never
    /// pruned, matching the walk that only filters child names.
    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.config.ignored_dirs.iter().any(|d| d == name))
    }
}

/// Shallow-merge a data file's top-level entries into a node, replacing
/// existing keys. Malformed or unreadable files are logged and skipped.
fn merge_data_file(path: &Path, node: &mut Map<String, Value>) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read file {}: {}", path.display(), e);
            return;
        }
    };

    let parsed: Value = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Malformed JSON in {}: {}", path.display(), e);
            return;
        }
    };

    match parsed {
        Value::Object(entries) => {
            debug!("Merging {} keys from {}", entries.len(), path.display());
            for (key, value) in entries {
                node.insert(key, value);
            }
        }
        other => {
            warn!(
                "Expected a JSON object in {}, found {}; skipping",
                path.display(),
                json_type_name(&other)
            );
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Serialize an aggregated tree the way the data files are written:
/// 2-space indent, non-ASCII characters emitted literally.
pub fn to_pretty_json(tree: &Map<String, Value>) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&Value::Object(tree.clone()))?)
}
