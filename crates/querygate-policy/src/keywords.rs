//! Whole-word keyword scan over statement text.
//!
//! This is the gate's fallback when a step reaches it without an assessment.
//! It matches tokens, not SQL semantics: `DELETE` inside a string literal
//! still counts, `deleted_at` does not.

/// Return the first keyword from `keywords` that appears in `text` as a
/// whole word, ignoring case.
pub fn find_keyword<'k>(text: &str, keywords: &'k [String]) -> Option<&'k str> {
    let words: Vec<&str> = text
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();

    keywords
        .iter()
        .find(|k| words.iter().any(|w| w.eq_ignore_ascii_case(k)))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::find_keyword;

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let destructive = kw(&["DROP", "DELETE"]);
        assert_eq!(find_keyword("delete from orders", &destructive), Some("DELETE"));
        assert_eq!(find_keyword("SELECT 1;DROP TABLE x", &destructive), Some("DROP"));
    }

    #[test]
    fn ignores_keywords_inside_identifiers() {
        let destructive = kw(&["DROP", "DELETE"]);
        assert_eq!(find_keyword("SELECT deleted_at, dropship FROM orders", &destructive), None);
    }
}
