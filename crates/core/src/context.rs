//! Session Context
//!
//! Per-session state shared by the rule engine and its host:
//!
//! 1. `ExecutionContext` trait - immutable session identity (id, project root)
//! 2. `ActiveLanguageSet` - insertion-ordered set of language tags relevant to the session
//! 3. `SessionContext` - concrete owner of both, held by the session loop
//!
//! The active set lives on the session object rather than in process-wide
//! state, so several project sessions can coexist in one process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tag of the language-agnostic bucket that is always injected.
pub const GENERAL_TAG: &str = "general";

// ============================================================================
// Tag sanitization
// ============================================================================

/// Lowercase a tag and drop every character outside `[a-z0-9-]`.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_tag(tag: &str) -> Option<String> {
    let cleaned: String = tag
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Like [`sanitize_tag`], but reports an unusable tag as an error.
pub fn validate_tag(tag: &str) -> CoreResult<String> {
    sanitize_tag(tag).ok_or_else(|| CoreError::invalid_tag(tag))
}

// ============================================================================
// ExecutionContext Trait
// ============================================================================

/// Read-only identity of a running session.
pub trait ExecutionContext: Send + Sync {
    /// Returns the unique session identifier.
    fn session_id(&self) -> &str;

    /// Returns the project root directory path.
    fn project_root(&self) -> &Path;
}

// ============================================================================
// ActiveLanguageSet
// ============================================================================

/// Language tags inferred to be relevant to the current session.
///
/// Iteration follows first insertion. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLanguageSet {
    tags: Vec<String>,
}

impl ActiveLanguageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, returning `true` if it was not present yet.
    ///
    /// Tags are sanitized first; tags that sanitize to nothing are ignored.
    pub fn insert(&mut self, tag: &str) -> bool {
        let Some(tag) = sanitize_tag(tag.trim()) else {
            return false;
        };
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Add every tag from an iterator, returning how many were new.
    pub fn extend<I, S>(&mut self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .filter(|tag| self.insert(tag.as_ref()))
            .count()
    }

    pub fn contains(&self, tag: &str) -> bool {
        sanitize_tag(tag).is_some_and(|t| self.tags.contains(&t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.tags.clone()
    }
}

// ============================================================================
// SessionContext
// ============================================================================

/// Owned state of one project session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: String,
    project_root: PathBuf,
    active_languages: ActiveLanguageSet,
    /// Set once the startup project scan has seeded the active set.
    seeded: bool,
}

impl SessionContext {
    /// Create a context for an existing project directory.
    pub fn new(session_id: impl Into<String>, project_root: impl Into<PathBuf>) -> CoreResult<Self> {
        let project_root = project_root.into();
        if !project_root.is_dir() {
            return Err(CoreError::config(format!(
                "Project root is not a directory: {}",
                project_root.display()
            )));
        }
        Ok(Self {
            session_id: session_id.into(),
            project_root,
            active_languages: ActiveLanguageSet::new(),
            seeded: false,
        })
    }

    pub fn active_languages(&self) -> &ActiveLanguageSet {
        &self.active_languages
    }

    pub fn active_languages_mut(&mut self) -> &mut ActiveLanguageSet {
        &mut self.active_languages
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn mark_seeded(&mut self) {
        self.seeded = true;
    }
}

impl ExecutionContext for SessionContext {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}
