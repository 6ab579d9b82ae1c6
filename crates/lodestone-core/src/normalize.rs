//! Token normalization for lexical indexing and querying.
//!
//! Both the index build and every term-level query go through the same
//! pipeline: lowercase, strip punctuation, split on whitespace, drop
//! stopwords, Porter-stem, and sort. Using one pipeline on both sides is
//! what makes term lookups line up with indexed tokens.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};

/// Shared Porter stemmer for English.
static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

/// Built-in english stopword list, whitespace-separated.
///
/// Entries are stored in post-punctuation-strip form ("dont", not "don't")
/// because stopword filtering runs after punctuation removal.
const DEFAULT_STOPWORDS: &str = "\
a about above after again against all am an and any are arent as at \
be because been before being below between both but by \
can cant cannot could couldnt \
did didnt do does doesnt doing dont down during \
each few for from further \
had hadnt has hasnt have havent having he hed hell hes her here heres hers \
herself him himself his how hows \
i id ill im ive if in into is isnt it its itself \
lets me more most mustnt my myself \
no nor not of off on once only or other ought our ours ourselves out over own \
same she shed shell shes should shouldnt so some such \
than that thats the their theirs them themselves then there theres these \
they theyd theyll theyre theyve this those through to too \
under until up very \
was wasnt we wed well were weve werent what whats when whens where wheres \
which while who whos whom why whys with wont would wouldnt \
you youd youll youre youve your yours yourself yourselves";

/// Text normalizer: punctuation-insensitive, stopword-filtered, stemmed.
///
/// Pure and deterministic; normalizing the same text always yields the same
/// token sequence, and normalization is idempotent over its own output.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stopwords: HashSet<String>,
}

impl Normalizer {
    /// Creates a normalizer from a flat whitespace-separated stopword list
    /// (the on-disk stopword file format).
    pub fn from_stopwords(stopwords: &str) -> Self {
        Self {
            stopwords: stopwords.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Normalizes text into an ordered token sequence.
    ///
    /// Steps: lowercase, strip ASCII punctuation, split on whitespace, drop
    /// stopwords, Porter-stem each remaining word, sort lexicographically.
    /// Empty or whitespace-only input yields an empty sequence.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let stripped: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .collect();

        let mut tokens: Vec<String> = stripped
            .split_whitespace()
            .filter(|word| !self.stopwords.contains(*word))
            .map(|word| STEMMER.stem(word).into_owned())
            .collect();
        tokens.sort();
        tokens
    }

    /// Normalizes text into the sorted set of distinct tokens.
    ///
    /// Used when building postings, where each document contributes each
    /// token once regardless of its frequency.
    pub fn normalize_unique(&self, text: &str) -> Vec<String> {
        let unique: BTreeSet<String> = self.normalize(text).into_iter().collect();
        unique.into_iter().collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_stopwords(DEFAULT_STOPWORDS)
    }
}
