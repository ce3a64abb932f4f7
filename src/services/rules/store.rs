//! Rule Document Store
//!
//! One markdown document per language tag, named `<tag>.md`, inside a single
//! storage directory:
//!
//! ```text
//! # Rust Rules
//!
//! - Never use unwrap in library code.
//! - Prefer thiserror for error enums.
//! ```
//!
//! Reading is tolerant of manual edits: only `- ` and `* ` bullet lines are
//! rules, everything else is ignored. Writing only ever appends `- ` bullets.
//! There is no locking; the store assumes a single writer.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use agent_context_core::{sanitize_tag, GENERAL_TAG};

use crate::utils::error::AppResult;
use crate::utils::paths::{context_dir_for, ensure_dir};

const DOC_EXTENSION: &str = "md";

/// File-backed store of rule documents
#[derive(Debug, Clone)]
pub struct ContextStore {
    dir: PathBuf,
}

impl ContextStore {
    /// Store rooted at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store for a project, `context_dir` being relative to the project root
    pub fn for_project(project_root: &Path, context_dir: &str) -> Self {
        Self::new(context_dir_for(project_root, context_dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Storage key for a tag; tags with no usable characters fall back to `general`.
    pub fn storage_key(tag: &str) -> String {
        sanitize_tag(tag).unwrap_or_else(|| GENERAL_TAG.to_string())
    }

    fn doc_path(&self, tag: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", Self::storage_key(tag), DOC_EXTENSION))
    }

    /// Raw document content, `None` if the document does not exist.
    ///
    /// Invalid UTF-8 (a torn write) is decoded lossily so one damaged
    /// document cannot block the others.
    pub fn get_context_file_content(&self, tag: &str) -> AppResult<Option<String>> {
        match fs::read(self.doc_path(tag)) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => Ok(Some(content)),
                Err(e) => {
                    tracing::warn!(language = %Self::storage_key(tag), "rule document is not valid UTF-8");
                    Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Rules of one tag, in document order.
    pub fn read_rules(&self, tag: &str) -> AppResult<Vec<String>> {
        Ok(self
            .get_context_file_content(tag)?
            .map(|content| parse_rules(&content))
            .unwrap_or_default())
    }

    /// Append a rule to the tag's document.
    ///
    /// Returns `false` without touching the file when the rule is blank or
    /// already present (compared case-insensitively).
    pub fn add_rule(&self, tag: &str, rule: &str) -> AppResult<bool> {
        let rule = rule.trim();
        if rule.is_empty() {
            return Ok(false);
        }

        ensure_dir(&self.dir)?;
        let key = Self::storage_key(tag);
        let path = self.doc_path(&key);

        let content = match self.get_context_file_content(&key)? {
            Some(existing) => {
                let lowered = rule.to_lowercase();
                if parse_rules(&existing)
                    .iter()
                    .any(|r| r.to_lowercase() == lowered)
                {
                    tracing::debug!(language = %key, "rule already stored");
                    return Ok(false);
                }
                format!("{}\n- {}\n", existing.trim_end(), rule)
            }
            None => format!("# {} Rules\n\n- {}\n", capitalize(&key), rule),
        };

        fs::write(&path, content)?;
        Ok(true)
    }

    /// Every tag with at least one rule.
    pub fn get_all_rules(&self) -> AppResult<BTreeMap<String, Vec<String>>> {
        let mut all = BTreeMap::new();
        for tag in self.list_context_files()? {
            let rules = self.read_rules(&tag)?;
            if !rules.is_empty() {
                all.insert(tag, rules);
            }
        }
        Ok(all)
    }

    /// Tags of all documents present, sorted by name, empty ones included.
    pub fn list_context_files(&self) -> AppResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tags = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tags.push(stem.to_string());
            }
        }
        tags.sort();
        Ok(tags)
    }
}

/// Bullet items of a rule document.
pub fn parse_rules(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .map(str::trim)
        })
        .filter(|rule| !rule.is_empty())
        .map(str::to_string)
        .collect()
}

/// Heading form of a tag: `rust` -> `Rust`.
pub(crate) fn capitalize(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
