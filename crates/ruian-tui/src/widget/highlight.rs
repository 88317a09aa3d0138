use regex::{Regex, RegexBuilder};

/// Escape `text` so it matches only itself when compiled as a pattern.
pub fn escape_regex(text: &str) -> String {
    regex::escape(text)
}

fn query_pattern(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&escape_regex(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// A run of text, emphasized when it matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub emphasized: bool,
}

/// Split `text` into plain and matching runs. Matches are found left to right
/// without overlap.
pub fn highlight_segments<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    let Some(pattern) = query_pattern(query) else {
        return vec![Segment {
            text,
            emphasized: false,
        }];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
        if m.start() > last {
            segments.push(Segment {
                text: &text[last..m.start()],
                emphasized: false,
            });
        }
        segments.push(Segment {
            text: m.as_str(),
            emphasized: true,
        });
        last = m.end();
    }
    if last < text.len() || segments.is_empty() {
        segments.push(Segment {
            text: &text[last..],
            emphasized: false,
        });
    }
    segments
}

/// `text` with every case-insensitive occurrence of `query` wrapped in `<em>`.
pub fn highlight_text(text: &str, query: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in highlight_segments(text, query) {
        if segment.emphasized {
            out.push_str("<em>");
            out.push_str(segment.text);
            out.push_str("</em>");
        } else {
            out.push_str(segment.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_wraps_match() {
        assert_eq!(highlight_text("Main St", "ain"), "M<em>ain</em> St");
    }

    #[test]
    fn test_highlight_is_case_insensitive() {
        assert_eq!(highlight_text("Main St", "MAIN"), "<em>Main</em> St");
        assert_eq!(highlight_text("Čermákova", "čer"), "<em>Čer</em>mákova");
    }

    #[test]
    fn test_every_occurrence_is_wrapped() {
        assert_eq!(highlight_text("aaa", "a"), "<em>a</em><em>a</em><em>a</em>");
        assert_eq!(highlight_text("aaaa", "aa"), "<em>aa</em><em>aa</em>");
        assert_eq!(highlight_text("aaa", "aa"), "<em>aa</em>a");
    }

    #[test]
    fn test_empty_query_is_identity() {
        for text in ["", "Main St", "a.b*c", "<em>"] {
            assert_eq!(highlight_text(text, ""), text);
        }
    }

    #[test]
    fn test_no_match_is_identity() {
        assert_eq!(highlight_text("Main St", "xyz"), "Main St");
    }

    #[test]
    fn test_metacharacters_are_literal() {
        assert_eq!(highlight_text("a.b a-b", "a.b"), "<em>a.b</em> a-b");
        assert_eq!(highlight_text("1+1 11", "1+1"), "<em>1+1</em> 11");
        assert_eq!(highlight_text("(x) x", "(x)"), "<em>(x)</em> x");
    }

    #[test]
    fn test_escaped_pattern_matches_only_literal() {
        for original in ["a.c", "x*", "[ab]", "^$", "a|b", "\\d", "(?i)", "{2}"] {
            let pattern = Regex::new(&escape_regex(original)).unwrap();
            assert!(pattern.is_match(original), "{original} should match itself");
            let found: Vec<_> = pattern
                .find_iter(&format!("zz{original}zz abc aXc xx"))
                .map(|m| m.as_str().to_string())
                .collect();
            assert_eq!(found, vec![original.to_string()]);
        }
    }

    #[test]
    fn test_segments_cover_text() {
        let segments = highlight_segments("Main St Main", "main");
        let joined: String = segments.iter().map(|s| s.text).collect();
        assert_eq!(joined, "Main St Main");
        assert_eq!(segments.iter().filter(|s| s.emphasized).count(), 2);
    }
}
