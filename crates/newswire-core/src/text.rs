//! Small text helpers shared by the normalizer and the enrichment steps.

use html2text::render::TrivialDecorator;

/// Wide enough that html2text never has to wrap a feed title or description
const RENDER_WIDTH: usize = 4096;

/// Render an HTML fragment as plain text on a single line.
///
/// Named and numeric entities are decoded. Line breaks from block elements
/// collapse into single spaces.
pub(crate) fn clean_html(html: &str) -> String {
    let text = html2text::from_read_with_decorator(
        html.as_bytes(),
        RENDER_WIDTH,
        TrivialDecorator::new(),
    )
    .unwrap_or_else(|_| html.to_string());
    collapse_whitespace(&text)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Count whole-word occurrences of `keyword` in `haystack`.
///
/// Both arguments must already be lowercase. A trailing plural `s`/`es`
/// on the haystack word still counts as a match.
pub(crate) fn keyword_hits(haystack: &str, keyword: &str) -> usize {
    if keyword.is_empty() {
        return 0;
    }

    haystack
        .match_indices(keyword)
        .filter(|(start, _)| {
            let starts_word = haystack[..*start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let rest = &haystack[start + keyword.len()..];
            starts_word
                && (ends_word(rest)
                    || rest.strip_prefix("es").is_some_and(ends_word)
                    || rest.strip_prefix('s').is_some_and(ends_word))
        })
        .count()
}

fn ends_word(rest: &str) -> bool {
    rest.chars().next().map_or(true, |c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html() {
        assert_eq!(
            clean_html(r#"<a href="https://x">Budget &amp; you</a>&nbsp;&nbsp;<font>The Hindu</font>"#),
            "Budget & you The Hindu"
        );
        assert_eq!(clean_html("  plain\n\ttext  "), "plain text");
        assert_eq!(clean_html(""), "");
    }

    #[test]
    fn test_clean_html_decodes_numeric_and_named_entities() {
        assert_eq!(
            clean_html("Modi&#8217;s budget &mdash; &#x2019;"),
            "Modi\u{2019}s budget \u{2014} \u{2019}"
        );
        assert_eq!(clean_html("<p>Caf&eacute; <b>opens</b></p><p>today</p>"), "Café opens today");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_keyword_hits_whole_words() {
        assert_eq!(keyword_hits("the stock market fell", "stock"), 1);
        assert_eq!(keyword_hits("said the official", "ai"), 0);
        assert_eq!(keyword_hits("new ai model", "ai"), 1);
        assert_eq!(keyword_hits("union budget: budget session", "budget"), 2);
        assert_eq!(keyword_hits("stock market crashes", "crash"), 1);
        assert_eq!(keyword_hits("new taxes announced", "tax"), 1);
        assert_eq!(keyword_hits("talks in warsaw", "war"), 0);
        assert_eq!(keyword_hits("the union budget is here", "union budget"), 1);
    }
}
