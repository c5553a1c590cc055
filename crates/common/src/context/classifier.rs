//! Query Classifier - Reduces a free-text query to a keyword set
//!
//! Provides:
//! - Lower-casing and word tokenization
//! - English stop-word removal
//! - Trigger lists that decide which context sections are assembled

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Words that ask for the code of conduct
pub const POLICY_TRIGGERS: &[&str] = &["code", "conduct", "rule", "policy", "attendance"];

/// Words that ask for uploaded files to be searched for the student
pub const FILE_TRIGGERS: &[&str] = &["report", "performance", "grade", "score"];

/// Words that ask for the full student listing
pub const LISTING_TRIGGERS: &[&str] = &["list", "show", "students", "student"];

const WORD_PATTERN: &str = r"[a-z0-9]+";

/// Deduplicated, unordered set of content words from one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet {
    words: BTreeSet<String>,
}

impl KeywordSet {
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// True when at least one of `triggers` is present
    pub fn any_of(&self, triggers: &[&str]) -> bool {
        triggers.iter().any(|t| self.contains(t))
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().map(Into::into).collect(),
        }
    }
}

enum Tokenizer {
    Pattern(Regex),
    Whitespace,
}

/// Query classifier
pub struct QueryClassifier {
    tokenizer: Tokenizer,
    stop_words: BTreeSet<&'static str>,
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClassifier {
    /// Create a classifier with the pattern tokenizer, degrading to whitespace
    /// splitting when the pattern cannot be compiled
    pub fn new() -> Self {
        let tokenizer = match Regex::new(WORD_PATTERN) {
            Ok(re) => Tokenizer::Pattern(re),
            Err(e) => {
                warn!(error = %e, "Word tokenizer unavailable, using whitespace split");
                Tokenizer::Whitespace
            }
        };

        Self::with_tokenizer(tokenizer)
    }

    fn with_tokenizer(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Extract the keyword set of a query
    pub fn classify(&self, query: &str) -> KeywordSet {
        let query = query.to_lowercase();

        let tokens: Vec<&str> = match &self.tokenizer {
            Tokenizer::Pattern(re) => re.find_iter(&query).map(|m| m.as_str()).collect(),
            Tokenizer::Whitespace => query
                .split_whitespace()
                .filter(|word| word.len() > 2)
                .collect(),
        };

        tokens
            .into_iter()
            .filter(|token| !self.stop_words.contains(token))
            .collect()
    }
}

// NLTK English stop-word list
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
    "you've", "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he",
    "him", "his", "himself", "she", "she's", "her", "hers", "herself", "it", "it's",
    "its", "itself", "they", "them", "their", "theirs", "themselves", "what",
    "which", "who", "whom", "this", "that", "that'll", "these", "those", "am", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
    "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about",
    "against", "between", "into", "through", "during", "before", "after", "above",
    "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some",
    "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very",
    "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn",
    "couldn't", "didn", "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn",
    "hasn't", "haven", "haven't", "isn", "isn't", "ma", "mightn", "mightn't",
    "mustn", "mustn't", "needn", "needn't", "shan", "shan't", "shouldn",
    "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];
