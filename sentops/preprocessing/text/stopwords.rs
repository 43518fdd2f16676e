use std::{collections::HashSet, fs, path::Path};

use super::NormalizeError;

/// Negation and contrast words kept even when they are stopwords.
pub const RETAINED_WORDS: [&str; 5] = ["not", "but", "however", "no", "yet"];

/// Standard English stopword corpus (179 entries).
const ENGLISH: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Set of words dropped during normalization.
#[derive(Debug, Clone)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    /// English stopwords minus [`RETAINED_WORDS`].
    #[must_use]
    pub fn english() -> Self {
        let mut set = Self {
            words: HashSet::with_capacity(ENGLISH.len()),
        };
        set.extend(ENGLISH.iter().copied());
        set
    }

    /// Adds words; retained words are ignored.
    pub fn extend<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        for word in words {
            let word = word.trim().to_lowercase();
            if word.is_empty() || RETAINED_WORDS.contains(&word.as_str()) {
                continue;
            }
            self.words.insert(word);
        }
    }

    /// Adds one word per line from a file. Blank lines and `#` comments are skipped.
    pub fn extend_from_path(&mut self, path: &Path) -> Result<usize, NormalizeError> {
        let raw = fs::read_to_string(path).map_err(|source| NormalizeError::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        let before = self.words.len();
        self.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        );
        Ok(self.words.len() - before)
    }

    /// Returns true if `word` should be removed.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Number of words in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self::english()
    }
}
