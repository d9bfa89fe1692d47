//! Registry of the questions SteamCMD may ask.

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use log::debug;
use regex::bytes::Regex;

use super::matcher::PromptMatcher;
use crate::error::{RegistryError, Result};

/// Global question registry.
static REGISTRY: LazyLock<Arc<QuestionRegistry>> =
    LazyLock::new(|| Arc::new(QuestionRegistry::steamcmd()));

/// A prompt SteamCMD may print, and the question to surface when it does.
#[derive(Debug, Clone)]
pub struct RegisteredQuestion {
    /// Pattern matched against terminal output.
    pattern: Regex,

    /// Question text handed to the consumer.
    text: String,

    /// Whether the answer must be kept out of logs and transcripts.
    sensitive: bool,
}

impl RegisteredQuestion {
    /// Compile a registered question.
    pub fn new(pattern: &str, text: impl Into<String>, sensitive: bool) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(RegistryError::EmptyText {
                pattern: pattern.to_string(),
            }
            .into());
        }

        let compiled = Regex::new(pattern).map_err(|source| RegistryError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: compiled,
            text,
            sensitive,
        })
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The question text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the question is sensitive.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }
}

/// Append-only, ordered table of recognized prompts.
///
/// Entries are matched in registration order, so register the most
/// specific prompts first. A registry is usually built once at startup and
/// shared by reference; [`QuestionRegistry::global`] provides a process-wide
/// instance for applications that don't want to carry one around.
#[derive(Debug, Default)]
pub struct QuestionRegistry {
    entries: RwLock<Vec<RegisteredQuestion>>,
}

impl QuestionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the prompts SteamCMD asks during login.
    pub fn steamcmd() -> Self {
        let registry = Self::new();
        registry.register_builtin_questions();
        registry
    }

    /// Get the global registry, pre-loaded with the built-in SteamCMD prompts.
    pub fn global() -> Arc<QuestionRegistry> {
        Arc::clone(&REGISTRY)
    }

    /// Register built-in SteamCMD prompts.
    fn register_builtin_questions(&self) {
        let builtin = [
            (r"Steam Guard code:", "Steam Guard code", true),
            (r"Two-factor code:", "Two-factor code", true),
        ];

        let mut entries = self.write();
        for (pattern, text, sensitive) in builtin {
            if let Ok(question) = RegisteredQuestion::new(pattern, text, sensitive) {
                entries.push(question);
            }
        }
    }

    /// Register a question.
    ///
    /// `pattern` is a regular expression matched against each chunk of
    /// terminal output, `text` is the question surfaced when it matches.
    /// Fails with [`RegistryError::InvalidPattern`] if the pattern does not
    /// compile and with [`RegistryError::EmptyText`] if `text` is empty (an
    /// empty question is the end-of-interview sentinel). The registry is
    /// left untouched on failure.
    pub fn register(&self, pattern: &str, text: impl Into<String>, sensitive: bool) -> Result<()> {
        let question = RegisteredQuestion::new(pattern, text, sensitive)?;
        debug!(
            "registering question {:?} for pattern {:?}",
            question.text,
            question.pattern.as_str()
        );
        self.write().push(question);
        Ok(())
    }

    /// Find the first registered question whose pattern matches `data`.
    pub fn find(&self, data: &[u8]) -> Option<RegisteredQuestion> {
        self.read()
            .iter()
            .find(|question| question.is_match(data))
            .cloned()
    }

    /// Number of registered questions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if no questions are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<RegisteredQuestion>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<RegisteredQuestion>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_register_and_find() {
        let registry = QuestionRegistry::new();
        registry.register(r"guard code", "guard code", true).unwrap();

        let question = registry.find(b"Please enter your guard code:").unwrap();
        assert_eq!(question.text(), "guard code");
        assert!(question.is_sensitive());
        assert!(registry.find(b"Loading Steam API...OK").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let registry = QuestionRegistry::new();
        let err = registry.register(r"code(", "code", false).unwrap_err();

        assert!(matches!(
            err,
            Error::Registry(RegistryError::InvalidPattern { ref pattern, .. }) if pattern == "code("
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_question_text_is_rejected() {
        let registry = QuestionRegistry::new();
        assert!(matches!(
            registry.register(r"code:", "", false),
            Err(Error::Registry(RegistryError::EmptyText { .. }))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registration_order_wins() {
        let registry = QuestionRegistry::new();
        registry.register(r"code:", "generic code", false).unwrap();
        registry.register(r"Steam Guard code:", "Steam Guard code", true).unwrap();

        let question = registry.find(b"Steam Guard code:").unwrap();
        assert_eq!(question.text(), "generic code");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_builtin_steamcmd_questions() {
        let registry = QuestionRegistry::steamcmd();
        assert_eq!(registry.len(), 2);

        let guard = registry
            .find(b"Please check your email for the message from Steam.\nSteam Guard code:")
            .unwrap();
        assert_eq!(guard.text(), "Steam Guard code");
        assert!(guard.is_sensitive());

        let two_factor = registry.find(b"Two-factor code:").unwrap();
        assert_eq!(two_factor.text(), "Two-factor code");
    }

    #[test]
    fn test_global_registry_is_shared() {
        let first = QuestionRegistry::global();
        let second = QuestionRegistry::global();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.find(b"Two-factor code:").is_some());
    }
}
