use regex::Regex;
use shared_logging::StageLogger;

use super::{
    lemmatizer::{Lemmatizer, RuleLemmatizer},
    stopwords::StopwordSet,
    NormalizeError,
};

/// Anything that is not an ASCII letter, digit, whitespace or `! ? . ,`.
const DISALLOWED_CHARS: &str = r"[^A-Za-z0-9\s!?.,]";

/// Cleans raw comment text for the sentiment model.
///
/// Steps run in a fixed order: lowercase, trim, newlines to spaces, character
/// filter, stopword removal (keeping negation and contrast words), lemmatization.
/// [`CommentNormalizer::normalize`] never fails; errors fall back to the input.
#[derive(Debug, Clone)]
pub struct CommentNormalizer<L = RuleLemmatizer> {
    disallowed: Regex,
    stopwords: StopwordSet,
    lemmatizer: L,
    logger: Option<StageLogger>,
}

impl CommentNormalizer<RuleLemmatizer> {
    /// Normalizer with the built-in English stopwords and rule lemmatizer.
    pub fn english() -> Result<Self, NormalizeError> {
        Self::new(StopwordSet::english(), RuleLemmatizer::new())
    }
}

impl<L: Lemmatizer> CommentNormalizer<L> {
    /// Creates a normalizer from explicit resources.
    pub fn new(stopwords: StopwordSet, lemmatizer: L) -> Result<Self, NormalizeError> {
        Ok(Self {
            disallowed: Regex::new(DISALLOWED_CHARS)?,
            stopwords,
            lemmatizer,
            logger: None,
        })
    }

    /// Attaches the stage logger used for per-comment failures.
    #[must_use]
    pub fn with_logger(mut self, logger: StageLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Logger attached to this normalizer, if any.
    #[must_use]
    pub const fn logger(&self) -> Option<&StageLogger> {
        self.logger.as_ref()
    }

    /// Cleans `comment`; on any failure logs it and returns the input unchanged.
    #[must_use]
    pub fn normalize(&self, comment: &str) -> String {
        self.normalize_counted(comment).0
    }

    /// Like [`Self::normalize`], also reporting whether the input was kept
    /// because cleaning failed.
    #[must_use]
    pub fn normalize_counted(&self, comment: &str) -> (String, bool) {
        match self.try_normalize(comment) {
            Ok(cleaned) => (cleaned, false),
            Err(err) => {
                if let Some(logger) = &self.logger {
                    logger.error(format!("Error in preprocessing comment: {err}"));
                }
                (comment.to_string(), true)
            }
        }
    }

    /// Runs every cleaning step, surfacing the first error.
    pub fn try_normalize(&self, comment: &str) -> Result<String, NormalizeError> {
        let lowered = comment.to_lowercase();
        let trimmed = lowered.trim().replace('\n', " ");
        let filtered = self.disallowed.replace_all(&trimmed, "");

        let kept: Vec<&str> = filtered
            .split_whitespace()
            .filter(|word| !self.stopwords.contains(word))
            .collect();

        let mut lemmas = Vec::with_capacity(kept.len());
        for word in kept {
            lemmas.push(self.lemmatizer.lemmatize(word)?);
        }
        Ok(lemmas.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::text::stopwords::RETAINED_WORDS;
    use shared_logging::LogLevel;
    use tempfile::tempdir;

    struct FailingLemmatizer;

    impl Lemmatizer for FailingLemmatizer {
        fn lemmatize<'a>(&self, word: &'a str) -> Result<Cow<'a, str>, NormalizeError> {
            if word == "boom" {
                Err(NormalizeError::Lemmatize {
                    word: word.to_string(),
                    reason: "back-end unavailable".into(),
                })
            } else {
                Ok(Cow::Borrowed(word))
            }
        }
    }

    fn tokens(text: &str) -> Vec<&str> {
        text.split(' ').collect()
    }

    #[test]
    fn cleans_the_reference_comment() {
        let normalizer = CommentNormalizer::english().unwrap();
        let cleaned = normalizer.normalize("I Really Liked It!! \nBut NOT the ending.");
        assert_eq!(cleaned, "really liked it!! but not ending.");
        let words = tokens(&cleaned);
        assert!(words.contains(&"but"));
        assert!(words.contains(&"not"));
        assert!(!words.contains(&"the"));
        assert!(!words.contains(&"it"));
        assert!(!words.contains(&"i"));
    }

    #[test]
    fn negation_and_contrast_words_survive() {
        let normalizer = CommentNormalizer::english().unwrap();
        let cleaned = normalizer.normalize("no, it was not good however it is yet to improve but ok");
        for word in RETAINED_WORDS {
            assert!(
                cleaned.split(|c: char| c.is_whitespace() || c == ',').any(|w| w == word),
                "{word} missing from {cleaned:?}"
            );
        }
    }

    #[test]
    fn strips_disallowed_characters_and_lemmatizes() {
        let normalizer = CommentNormalizer::english().unwrap();
        let cleaned = normalizer.normalize("  Great   videos :) #subscribed @creator\nStories <3 ");
        assert_eq!(cleaned, "great video subscribed creator story 3");
    }

    #[test]
    fn empty_and_blank_inputs_become_empty() {
        let normalizer = CommentNormalizer::english().unwrap();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize(" \n\t "), "");
        assert_eq!(normalizer.normalize("the and of"), "");
    }

    #[test]
    fn non_ascii_text_never_fails() {
        let normalizer = CommentNormalizer::english().unwrap();
        assert_eq!(normalizer.normalize("Ünïcödé 😀 café"), "ncd caf");
    }

    #[test]
    fn lemmatizer_failure_returns_original_and_logs() {
        let dir = tempdir().unwrap();
        let logger = StageLogger::builder("data_preprocessing")
            .quiet()
            .file(dir.path().join("errors.log"), LogLevel::Error)
            .build()
            .unwrap();
        let normalizer = CommentNormalizer::new(StopwordSet::english(), FailingLemmatizer)
            .unwrap()
            .with_logger(logger.clone());
        let raw = "This went BOOM \n";
        assert_eq!(normalizer.normalize(raw), raw);
        assert!(normalizer.try_normalize(raw).is_err());
        assert_eq!(normalizer.normalize("Fine words"), "fine words");
        assert_eq!(normalizer.normalize_counted(raw), (raw.to_string(), true));
        assert_eq!(
            normalizer.normalize_counted("Fine words"),
            ("fine words".to_string(), false)
        );
        let log = std::fs::read_to_string(logger.file_path().unwrap()).unwrap();
        assert!(log.contains("Error in preprocessing comment: lemmatizing \"boom\""));
    }
}
