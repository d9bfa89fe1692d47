//! Matching terminal output against registered questions.
//!
//! Only the bytes of a single read are considered. A prompt whose text is
//! split across two reads is never detected; SteamCMD prints its prompts in
//! one write, so in practice a prompt arrives in one chunk.

use std::borrow::Cow;

use regex::bytes::Regex;
use vte::{Parser, Perform};

use super::registry::{QuestionRegistry, RegisteredQuestion};

/// Trait for prompt matching - regex by default.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    ///
    /// An empty match is not a match: a pattern that can match nothing
    /// would otherwise fire on every chunk.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find_iter(data)
            .find(|m| !m.is_empty())
            .map(|m| m.end())
    }
}

impl PromptMatcher for RegisteredQuestion {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.pattern().find_match(data)
    }
}

/// Match one chunk of terminal output against the registry.
///
/// Escape sequences are stripped first so colored prompts still match
/// plain patterns. Returns the first registered question that matches.
pub fn match_chunk(registry: &QuestionRegistry, chunk: &[u8]) -> Option<RegisteredQuestion> {
    if chunk.is_empty() {
        return None;
    }
    let text = strip_escapes(chunk);
    registry.find(&text)
}

/// Remove terminal escape sequences from `data`.
///
/// Printable text is kept along with newlines, carriage returns and tabs.
/// Data without an ESC byte is returned as-is.
pub fn strip_escapes(data: &[u8]) -> Cow<'_, [u8]> {
    if memchr::memchr(0x1b, data).is_none() {
        return Cow::Borrowed(data);
    }

    let mut text = PlainText(Vec::with_capacity(data.len()));
    let mut parser = Parser::new();
    parser.advance(&mut text, data);
    Cow::Owned(text.0)
}

/// `vte` performer that keeps only the plain text.
struct PlainText(Vec<u8>);

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.push(byte);
        }
    }
}
