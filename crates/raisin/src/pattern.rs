use regex::Regex;

use crate::error::RaisesError;

/// Searches `text` for `pattern` anywhere, like `re.search`.
pub(crate) fn search(pattern: &str, text: &str) -> Result<(), RaisesError> {
    let regex = Regex::new(pattern).map_err(|source| RaisesError::InvalidPattern {
        pattern: pattern.to_owned(),
        source,
    })?;
    if regex.is_match(text) {
        Ok(())
    } else {
        Err(RaisesError::PatternMismatch {
            pattern: pattern.to_owned(),
            text: text.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn search_is_unanchored() {
        assert!(search("bomb", "somebody set up us the bomb").is_ok());
        assert!(search("^some", "somebody set up us the bomb").is_ok());
    }

    #[test]
    fn mismatch_message_quotes_both_sides() {
        let err = search("2101", "somebody set up us the bomb").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Regex pattern '2101' does not match 'somebody set up us the bomb'."
        );
    }

    #[test]
    fn literal_text_that_is_not_a_regex_gets_a_hint() {
        let err = search("cost: $5 (approx)", "cost: $5 (approx)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Regex pattern 'cost: $5 (approx)' does not match 'cost: $5 (approx)'.\n Did you mean to `regex::escape()` the pattern?"
        );
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = search("(", "anything").unwrap_err();
        assert!(matches!(err, RaisesError::InvalidPattern { .. }));
        assert!(err.to_string().starts_with("invalid match pattern '(':"));
    }
}
