//! Manifest reader.
//!
//! The manifest is a plain text file listing the assets that should be live
//! in the scene:
//!
//! ```text
//! # anything that is not a `file` directive is skipped
//! file terrain/tile_0_0.vox
//! file "models/watch tower.vox"
//! ```
//!
//! Each line is split into tokens: bare whitespace-delimited words and
//! double-quoted strings (`\"` and `\\` escapes). The word `file` followed by
//! one token is a directive; every other token is ignored. An unterminated
//! quote drops the rest of its line.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AssetError, AssetResult};
use crate::id::AssetId;

/// Keyword introducing an asset path.
const FILE_DIRECTIVE: &str = "file";

/// Set of assets listed by one manifest read.
pub type ManifestSnapshot = BTreeSet<AssetId>;

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(String),
}

impl Token<'_> {
    fn into_path(self) -> Option<String> {
        let path = match self {
            Token::Word(word) => word.to_string(),
            Token::Quoted(text) => text,
        };
        (!path.is_empty()).then_some(path)
    }
}

/// Reads a manifest file into a fresh [`ManifestSnapshot`].
///
/// Stateless: every call re-reads the file.
#[derive(Debug, Clone)]
pub struct ManifestReader {
    path: PathBuf,
}

impl ManifestReader {
    /// Creates a reader for the manifest at `path`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Manifest path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest, used to resolve relative asset paths.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Reads the manifest, treating an unreadable file as empty.
    ///
    /// The failure is logged; the next read retries.
    #[must_use]
    pub fn read(&self) -> ManifestSnapshot {
        match self.try_read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("{e}");
                ManifestSnapshot::new()
            }
        }
    }

    /// Reads the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::ManifestUnreadable`] if the file cannot be read.
    pub fn try_read(&self) -> AssetResult<ManifestSnapshot> {
        let bytes = fs::read(&self.path).map_err(|source| AssetError::ManifestUnreadable {
            path: self.path.clone(),
            source,
        })?;

        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Parses manifest text.
    #[must_use]
    pub fn parse(text: &str) -> ManifestSnapshot {
        let mut snapshot = ManifestSnapshot::new();

        for (line_no, line) in text.lines().enumerate() {
            let mut tokens = tokenize(line).into_iter();
            let mut found = false;

            while let Some(token) = tokens.next() {
                if token != Token::Word(FILE_DIRECTIVE) {
                    continue;
                }
                if let Some(path) = tokens.next().and_then(Token::into_path) {
                    snapshot.insert(AssetId::from(path));
                    found = true;
                }
            }

            if !found && !line.trim().is_empty() {
                tracing::debug!(line = line_no + 1, "manifest line skipped");
            }
        }

        snapshot
    }
}

/// Splits one line into words and quoted strings.
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let Some((text, consumed)) = read_quoted(quoted) else {
                // Unterminated quote: nothing after it on this line is trusted
                break;
            };
            tokens.push(Token::Quoted(text));
            rest = quoted[consumed..].trim_start();
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '"')
                .unwrap_or(rest.len());
            tokens.push(Token::Word(&rest[..end]));
            rest = rest[end..].trim_start();
        }
    }

    tokens
}

/// Reads a quoted string body. Returns the unescaped text and the number of
/// bytes consumed including the closing quote.
fn read_quoted(body: &str) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut chars = body.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((text, idx + 1)),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => text.push(escaped),
                Some((_, other)) => {
                    text.push('\\');
                    text.push(other);
                }
                None => return None,
            },
            _ => text.push(c),
        }
    }

    None
}
