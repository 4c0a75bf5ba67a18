//! Unicode canonicalization and lexical tokenization.
//!
//! Every piece of text that is hashed, indexed, or embedded passes through
//! [`normalize`] first, at ingest time and at query time alike. Content
//! hashes and lexical matches are only comparable because both sides of the
//! pipeline share this exact canonical form.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

/// English stop words filtered out of the lexical token stream.
///
/// The NLTK English list, embedded verbatim so the ingest-side index and the
/// query-side probe can never drift apart.
static STOP_WORDS: &[&str] = &[
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
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static STOP_WORD_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Canonicalize text with Unicode NFKC (compose + compatibility fold).
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`. Visually or
/// semantically equivalent strings (full-width forms, ligatures, compatibility
/// variants) normalize to the same bytes and therefore hash and match
/// identically.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect()
}

/// Returns `true` if the case-folded token is a stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORD_SET.contains(token.to_lowercase().as_str())
}

/// Normalize and split into the stop-word-filtered lexical token list.
///
/// This is the query-side input to the store's disjunctive token match.
pub fn lexical_tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|token| !is_stop_word(token))
        .map(str::to_owned)
        .collect()
}

/// Normalize, drop stop words, and rejoin with single spaces.
///
/// The resulting string is what the store's `tokenized_text` payload field is
/// built from; [`lexical_tokens`] applied to a query must use the same rules
/// or lexical scores become incomparable.
pub fn tokenize_for_lexical(text: &str) -> String {
    lexical_tokens(text).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nfkc_folds_compatibility_forms() {
        // Full-width Latin letters compose down to ASCII.
        assert_eq!(normalize("\u{FF28}\u{FF45}\u{FF4C}\u{FF4C}\u{FF4F}"), "Hello");
        // The "fi" ligature decomposes.
        assert_eq!(normalize("\u{FB01}le"), "file");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = ["caf\u{E9}", "cafe\u{301}", "\u{FF21}BC", "plain ascii"];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn composed_and_decomposed_accents_normalize_equal() {
        assert_eq!(normalize("caf\u{E9}"), normalize("cafe\u{301}"));
    }

    #[test]
    fn stop_words_are_case_folded() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("The"));
        assert!(is_stop_word("THE"));
        assert!(!is_stop_word("network"));
    }

    #[test]
    fn tokenizer_drops_stop_words_and_rejoins() {
        let tokenized = tokenize_for_lexical("The  quick brown fox is on the   move");
        assert_eq!(tokenized, "quick brown fox move");
    }

    #[test]
    fn tokenizer_of_all_stop_words_is_empty() {
        assert!(lexical_tokens("the and of a").is_empty());
        assert_eq!(tokenize_for_lexical("the and of a"), "");
    }
}
