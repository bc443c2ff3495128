/// Strip markdown code fences from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Reduce a model answer to a bare lowercase token: fences, quotes and
/// trailing punctuation removed.
pub fn normalize_label(response: &str) -> String {
    strip_code_blocks(response)
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c.is_whitespace())
        .to_lowercase()
}

/// The vocabulary entry the answer names, if it names exactly one.
pub fn match_label<'a>(response: &str, labels: &[&'a str]) -> Option<&'a str> {
    let normalized = normalize_label(response);
    labels.iter().copied().find(|label| *label == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [&str; 3] = ["urgente", "importante", "normal"];

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```\nnormal\n```"), "normal");
    }

    #[test]
    fn test_match_label_tolerates_decoration() {
        assert_eq!(match_label(" \"Urgente\".\n", &LABELS), Some("urgente"));
        assert_eq!(match_label("`importante`", &LABELS), Some("importante"));
    }

    #[test]
    fn test_match_label_rejects_out_of_vocabulary() {
        assert_eq!(match_label("critical", &LABELS), None);
        assert_eq!(match_label("urgente ou importante", &LABELS), None);
        assert_eq!(match_label("", &LABELS), None);
    }
}
