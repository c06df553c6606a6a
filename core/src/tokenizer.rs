use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STRIP: Regex = Regex::new(r"[^A-Za-z0-9 ]+").expect("valid regex");
}

/// Remove everything but ASCII letters, digits and spaces, then lower-case.
pub fn normalize(text: &str) -> String {
    STRIP.replace_all(text, "").to_ascii_lowercase()
}

/// Normalize and split on whitespace, dropping tokens shorter than `min_len` chars.
pub fn words(text: &str, min_len: usize) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|w| w.len() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Every contiguous run of `min_n..=max_n` words, ordered by start position and
/// then by length. Terms are the words joined with a single space.
pub fn ngrams(words: &[String], min_n: usize, max_n: usize) -> Vec<String> {
    let mut out = Vec::new();
    if min_n == 0 {
        return out;
    }
    for start in 0..words.len() {
        for n in min_n..=max_n {
            let end = start + n;
            if end > words.len() {
                break;
            }
            out.push(words[start..end].join(" "));
        }
    }
    out
}

/// Terms of `text` under the given n-gram range and token length filter.
pub fn tokenize(text: &str, min_n: usize, max_n: usize, min_token_len: usize) -> Vec<String> {
    ngrams(&words(text, min_token_len), min_n, max_n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        assert_eq!(normalize("After the medication, headache!"), "after the medication headache");
    }

    #[test]
    fn ngrams_by_position_then_length() {
        let w: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ngrams(&w, 1, 3), vec!["a", "a b", "a b c", "b", "b c", "c"]);
        assert_eq!(ngrams(&w, 2, 2), vec!["a b", "b c"]);
    }
}
