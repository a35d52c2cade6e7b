// ============================================================
// Layer 4 - Answer Cleaner
// ============================================================
// Grade-school math answers carry calculator annotations and a
// final-answer marker:
//
//   "She has 3 + 4 = <<3+4=7>>7 apples.\n#### 7"
//
// Cleaning steps (applied in order):
//   1. Remove every `<<...>>` span (non-greedy, never crossing a
//      line break, several per line allowed)
//   2. Replace every `####` with "The answer is"
//
//   "She has 3 + 4 = 7 apples.\nThe answer is 7"
//
// Reference: regex crate documentation
//            Rust Book §8 (Strings in Rust)

use regex::Regex;
use std::sync::LazyLock;

/// Marker that precedes the final numeric answer.
pub const ANSWER_MARKER: &str = "####";

/// Phrase the marker is rewritten to.
pub const ANSWER_PHRASE: &str = "The answer is";

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<.*?>>").expect("Invalid annotation regex"));

/// Strip calculator annotations and rewrite the answer marker.
pub fn clean_answer(answer: &str) -> String {
    ANNOTATION
        .replace_all(answer, "")
        .replace(ANSWER_MARKER, ANSWER_PHRASE)
}

/// True if `text` still contains an annotation span.
pub fn has_annotation(text: &str) -> bool {
    ANNOTATION.is_match(text)
}
