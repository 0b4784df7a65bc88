//! Project file paths as the file explorer renders them
//!
//! The application titles explorer entries with a browser-dependent
//! separator: webkit shows `models/a.sql`, the other engines `models\a.sql`.
//! Logical paths (the ones used in API routes) always use `/`.

use std::fmt;

use crate::playwright::Browser;

/// Placeholder used when a path yields no segment to extract
pub const NOT_EXIST: &str = "NOT_EXIST";

/// Separator used in locator titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSeparator {
    Slash,
    Backslash,
}

impl PathSeparator {
    pub fn for_browser(browser: Browser) -> Self {
        match browser {
            Browser::Webkit => PathSeparator::Slash,
            Browser::Chromium | Browser::Firefox => PathSeparator::Backslash,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            PathSeparator::Slash => '/',
            PathSeparator::Backslash => '\\',
        }
    }
}

impl fmt::Display for PathSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A decomposed project file path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    /// Path as given, `/`-delimited
    pub logical: String,

    /// Path with the locator separator
    pub normalized: String,

    /// Final segment
    pub leaf: String,

    /// Parent folders, outermost first
    pub folders: Vec<String>,

    /// Parent folders joined with the locator separator, or the leaf for
    /// files at the project root
    pub parent: String,

    separator: PathSeparator,
}

impl TargetPath {
    pub fn parse(logical: &str, separator: PathSeparator) -> Self {
        let sep = separator.as_char();
        let normalized = logical.replace('/', &sep.to_string());

        let mut folders: Vec<String> = normalized.split(sep).map(String::from).collect();
        let leaf = folders.pop().unwrap_or_else(|| NOT_EXIST.to_string());
        let parent = if folders.is_empty() {
            leaf.clone()
        } else {
            folders.join(&sep.to_string())
        };

        Self {
            logical: logical.to_string(),
            normalized,
            leaf,
            folders,
            parent,
            separator,
        }
    }

    pub fn is_root(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn separator(&self) -> PathSeparator {
        self.separator
    }

    /// Human-readable location used in progress messages
    pub fn location(&self) -> &str {
        if self.is_root() {
            "root"
        } else {
            &self.parent
        }
    }

    /// API route serving this file
    pub fn api_route(&self) -> String {
        format!("/api/files/{}", self.logical)
    }

    /// Cumulative folder titles visited when descending to the parent
    pub fn folder_titles(&self) -> Vec<String> {
        cumulative_titles(&self.folders, self.separator)
    }
}

/// Build `a`, `a/b`, `a/b/c` from `[a, b, c]`
///
/// Empty segments only extend a prefix that already exists, so a leading
/// separator adds no title while `a//b` still yields `a/` on the way down.
pub fn cumulative_titles(folders: &[String], separator: PathSeparator) -> Vec<String> {
    let mut titles = Vec::with_capacity(folders.len());
    let mut current = String::new();

    for folder in folders {
        if current.is_empty() {
            current = folder.clone();
        } else {
            current = format!("{}{}{}", current, separator, folder);
        }
        if !current.is_empty() {
            titles.push(current.clone());
        }
    }

    titles
}
