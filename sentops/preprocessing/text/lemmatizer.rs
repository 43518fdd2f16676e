use std::{borrow::Cow, collections::HashMap, fs, path::Path};

use super::NormalizeError;

/// Reduces a single word to its dictionary base form.
pub trait Lemmatizer: Send + Sync {
    /// Returns the lemma of `word`, borrowing when the word is already a base form.
    fn lemmatize<'a>(&self, word: &'a str) -> Result<Cow<'a, str>, NormalizeError>;
}

/// Irregular plurals and plural forms the detachment rules would get wrong.
const EXCEPTIONS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("oxen", "ox"),
    ("lice", "louse"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("analyses", "analysis"),
    ("theses", "thesis"),
    ("crises", "crisis"),
    ("hypotheses", "hypothesis"),
    ("diagnoses", "diagnosis"),
    ("cacti", "cactus"),
    ("fungi", "fungus"),
    ("nuclei", "nucleus"),
    ("stimuli", "stimulus"),
    ("alumni", "alumnus"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("appendices", "appendix"),
    ("wolves", "wolf"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
    ("leaves", "leaf"),
    ("halves", "half"),
    ("shelves", "shelf"),
    ("selves", "self"),
    ("thieves", "thief"),
    ("loaves", "loaf"),
    ("calves", "calf"),
    ("elves", "elf"),
    ("scarves", "scarf"),
    ("hooves", "hoof"),
    ("quizzes", "quiz"),
    ("buses", "bus"),
    ("gases", "gas"),
    ("lenses", "lens"),
    ("heroes", "hero"),
    ("potatoes", "potato"),
    ("tomatoes", "tomato"),
    ("echoes", "echo"),
    ("vetoes", "veto"),
    ("goes", "go"),
    ("movies", "movie"),
    ("cookies", "cookie"),
    ("pies", "pie"),
    ("ties", "tie"),
    ("lies", "lie"),
    ("zombies", "zombie"),
    ("selfies", "selfie"),
    ("rookies", "rookie"),
    ("calories", "calorie"),
    ("brownies", "brownie"),
    ("hoodies", "hoodie"),
    ("aunties", "auntie"),
    ("aches", "ache"),
    ("headaches", "headache"),
    ("earaches", "earache"),
    ("toothaches", "toothache"),
    ("caches", "cache"),
    ("niches", "niche"),
    ("avalanches", "avalanche"),
    ("moustaches", "moustache"),
    ("mustaches", "mustache"),
];

/// Words ending in `s` that are already base forms.
const INVARIANT: &[&str] = &[
    "news", "series", "species", "means", "lens", "yes", "thus", "plus", "always", "perhaps",
    "sometimes", "afterwards", "towards", "besides", "whereas", "unless", "christmas", "atlas",
    "canvas", "chaos", "bias", "alias", "corps", "thanks", "kudos", "whiskers",
];

/// Words ending in `men` that are not compounds of `man`.
const MEN_BASE_FORMS: &[&str] = &[
    "specimen", "abdomen", "omen", "regimen", "stamen", "hymen", "semen", "acumen", "albumen",
    "bitumen", "lumen", "foramen", "germen", "yemen",
];

/// Endings that mark a singular word.
const SINGULAR_ENDINGS: &[&str] = &["ss", "us", "is", "ics"];

/// Detachment rules, most specific first.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("sses", "ss"),
    ("zzes", "zz"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("xes", "x"),
    ("men", "man"),
    ("s", ""),
];

/// Noun lemmatizer following WordNet-style morphology: exception table first,
/// then suffix detachment.
#[derive(Debug, Clone)]
pub struct RuleLemmatizer {
    exceptions: HashMap<String, String>,
}

impl RuleLemmatizer {
    /// Builds the lemmatizer with the built-in exception table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            exceptions: EXCEPTIONS
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        }
    }

    /// Adds an exception, overriding built-in entries.
    pub fn insert_exception(&mut self, inflected: impl Into<String>, lemma: impl Into<String>) {
        self.exceptions
            .insert(inflected.into().to_lowercase(), lemma.into().to_lowercase());
    }

    /// Loads `inflected<TAB>lemma` lines. Blank lines and `#` comments are skipped.
    pub fn extend_from_path(&mut self, path: &Path) -> Result<usize, NormalizeError> {
        let raw = fs::read_to_string(path).map_err(|source| NormalizeError::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        let mut added = 0;
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t').map(str::trim);
            match (fields.next(), fields.next(), fields.next()) {
                (Some(from), Some(to), None) if !from.is_empty() && !to.is_empty() => {
                    self.insert_exception(from, to);
                    added += 1;
                }
                _ => {
                    return Err(NormalizeError::InvalidResource {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        reason: "expected `inflected<TAB>lemma`".into(),
                    })
                }
            }
        }
        Ok(added)
    }

    fn reduce<'a>(&self, word: &'a str) -> Cow<'a, str> {
        if let Some(lemma) = self.exceptions.get(word) {
            return Cow::Owned(lemma.clone());
        }
        if word.len() <= 3
            || !word.bytes().all(|b| b.is_ascii_lowercase())
            || INVARIANT.contains(&word)
            || MEN_BASE_FORMS.contains(&word)
            || SINGULAR_ENDINGS.iter().any(|end| word.ends_with(end))
        {
            return Cow::Borrowed(word);
        }
        for (suffix, replacement) in SUFFIX_RULES {
            if let Some(stem) = word.strip_suffix(suffix) {
                if stem.len() >= 2 {
                    return Cow::Owned(format!("{stem}{replacement}"));
                }
            }
        }
        Cow::Borrowed(word)
    }
}

impl Default for RuleLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer for RuleLemmatizer {
    fn lemmatize<'a>(&self, word: &'a str) -> Result<Cow<'a, str>, NormalizeError> {
        Ok(self.reduce(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lemma(word: &str) -> String {
        RuleLemmatizer::new().lemmatize(word).unwrap().into_owned()
    }

    #[test]
    fn regular_plurals_lose_their_suffix() {
        assert_eq!(lemma("videos"), "video");
        assert_eq!(lemma("stories"), "story");
        assert_eq!(lemma("churches"), "church");
        assert_eq!(lemma("boxes"), "box");
        assert_eq!(lemma("classes"), "class");
        assert_eq!(lemma("horses"), "horse");
        assert_eq!(lemma("salesmen"), "salesman");
    }

    #[test]
    fn men_compounds_become_man() {
        assert_eq!(lemma("policemen"), "policeman");
        assert_eq!(lemma("firemen"), "fireman");
        assert_eq!(lemma("gentlemen"), "gentleman");
        assert_eq!(lemma("women"), "woman");
        let lemmatizer = RuleLemmatizer::new();
        for word in ["specimen", "abdomen", "omen", "regimen", "stamen", "hymen"] {
            let out = lemmatizer.lemmatize(word).unwrap();
            assert!(matches!(out, Cow::Borrowed(_)), "{word} changed to {out}");
        }
    }

    #[test]
    fn sibilant_plurals_keep_their_stem() {
        assert_eq!(lemma("sizes"), "size");
        assert_eq!(lemma("horses"), "horse");
        assert_eq!(lemma("buzzes"), "buzz");
        assert_eq!(lemma("glasses"), "glass");
        assert_eq!(lemma("dishes"), "dish");
    }

    #[test]
    fn irregular_forms_use_the_exception_table() {
        assert_eq!(lemma("children"), "child");
        assert_eq!(lemma("movies"), "movie");
        assert_eq!(lemma("knives"), "knife");
        assert_eq!(lemma("headaches"), "headache");
    }

    #[test]
    fn base_forms_are_borrowed() {
        let lemmatizer = RuleLemmatizer::new();
        for word in ["liked", "bus", "glass", "virus", "analysis", "news", "ending.", "it!!", "mp3s"] {
            let out = lemmatizer.lemmatize(word).unwrap();
            assert!(matches!(out, Cow::Borrowed(_)), "{word} changed to {out}");
        }
    }

    #[test]
    fn exception_file_overrides_rules() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lemmas.tsv");
        fs::write(&path, "# slang\nvids\tvideo\n").unwrap();
        let mut lemmatizer = RuleLemmatizer::new();
        assert_eq!(lemmatizer.extend_from_path(&path).unwrap(), 1);
        assert_eq!(lemmatizer.lemmatize("vids").unwrap(), "video");
    }

    #[test]
    fn malformed_exception_line_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lemmas.tsv");
        fs::write(&path, "vids video\n").unwrap();
        let err = RuleLemmatizer::new().extend_from_path(&path).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidResource { line: 1, .. }));
    }
}
