//! Text normalization: the ingest-time cleanup pass and the tokenizer the
//! Markov engine scans over.
//!
//! Two distinct passes exist and run at distinct moments (§4.A): the
//! comment-ingest pass happens once, when content is about to be stored in
//! the full-text mirror; tokenization happens later and repeatedly, every
//! time the Markov engine reads stored content. Keeping them separate lets
//! `query`'s FTS index and `talk`'s word stream agree on what "the text"
//! means without re-deriving it.

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*?>").unwrap());
static BRACKET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*?\]").unwrap());
static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bhttps?:\S*").unwrap());
static QUOTE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>+\s?").unwrap());
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\w'"-]+|[.,;:-]"#).unwrap());

/// HTML entities decoded in this exact order (§4.A step 1). `&quot;` maps to
/// the empty string rather than a literal quote — that's what the source
/// does, not a typo.
const ENTITIES: &[(&str, &str)] = &[
    ("&quot;", ""),
    ("&#x27;", "'"),
    ("&#x2F;", "/"),
    ("&gt;", ">"),
    ("&lt;", "<"),
    ("&amp;", "&"),
];

fn decode_entities(mut s: String) -> String {
    for (entity, replacement) in ENTITIES {
        if s.contains(entity) {
            s = s.replace(entity, replacement);
        }
    }
    s
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Drop a `'` unless both its neighbors are word characters (preserves
/// contractions like `I'm`, strips bracketing quotes like `'quoted'`).
fn drop_bare_single_quotes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '\'' {
            let left = i.checked_sub(1).and_then(|j| chars.get(j)).copied();
            let right = chars.get(i + 1).copied();
            let flanked = left.is_some_and(is_word_char) && right.is_some_and(is_word_char);
            if flanked {
                out.push(c);
            }
            // else: drop it
        } else {
            out.push(c);
        }
    }
    out
}

/// The comment-ingest normalization pass (§4.A). Applied once, before text is
/// written to the full-text mirror.
pub fn normalize_comment(raw: &str) -> String {
    let mut s = decode_entities(raw.to_string());
    s = TAG.replace_all(&s, " ").into_owned();
    s = BRACKET.replace_all(&s, " ").into_owned();
    s = URL.replace_all(&s, " ").into_owned();
    s = QUOTE_PREFIX.replace_all(&s, "").into_owned();
    drop_bare_single_quotes(&s)
}

/// A token in source order: either a word-like run or a single punctuation
/// character. The Markov engine treats both as first-class "words".
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// The punctuation tokens that attach to the preceding word with no leading
/// space when rendered (§4.E.4).
pub fn is_punctuation(token: &str) -> bool {
    matches!(token, "." | "," | ";" | ":" | "?" | "!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_entities_and_strips_tags() {
        let out = normalize_comment("&lt;b&gt;hi&lt;/b&gt;");
        assert_eq!(out.trim(), "hi");
    }

    #[test]
    fn preserves_contractions_but_drops_bracketing_quotes() {
        let out = normalize_comment(r#"'ok' I'm here"#);
        assert_eq!(out, "ok I'm here");
    }

    #[test]
    fn strips_urls() {
        let out = normalize_comment("see https://example.com/foo?bar=1 now");
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["see", "now"]);
    }

    #[test]
    fn strips_quote_prefixes() {
        let out = normalize_comment("> quoted line\nreply");
        assert!(!out.contains('>'));
    }

    #[test]
    fn strips_bracketed_tokens() {
        let out = normalize_comment("hello [1] world");
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["hello", "world"]);
    }

    #[test]
    fn end_to_end_scenario_3() {
        let raw = r#"&lt;b&gt;hi&lt;/b&gt; 'ok' I'm <a href="x">here</a>"#;
        let out = normalize_comment(raw);
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["hi", "ok", "I'm", "here"]);
    }

    #[test]
    fn tokenizes_words_and_punctuation() {
        let toks = tokenize("A B. A C.");
        assert_eq!(toks, vec!["A", "B", ".", "A", "C", "."]);
    }

    #[test]
    fn tokenizes_hyphens_and_quotes_as_part_of_words() {
        let toks = tokenize(r#"well-known "quoted" word"#);
        assert_eq!(toks, vec!["well-known", "\"quoted\"", "word"]);
    }

    #[test]
    fn punctuation_set_matches_render_rule() {
        for p in [".", ",", ";", ":", "?", "!"] {
            assert!(is_punctuation(p));
        }
        assert!(!is_punctuation("word"));
        assert!(!is_punctuation("-"));
    }
}
