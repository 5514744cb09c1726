//! Rendering helpers for HTML surfaces.
//!
//! The moderator hands back raw text. Anything that ends up inside markup
//! goes through one of these functions first.

/// Escape the characters that carry meaning in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape `text` and turn line breaks into `<br>`.
///
/// `\r\n` counts as a single break.
pub fn render_multiline(text: &str) -> String {
    escape_html(text)
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{ContentModerator, PLACEHOLDER};

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(escape_html("zażółć gęślą jaźń"), "zażółć gęślą jaźń");
        assert_eq!(render_multiline(""), "");
    }

    #[test]
    fn test_newlines_become_breaks() {
        assert_eq!(render_multiline("a\nb\r\nc"), "a<br>b<br>c");
        assert_eq!(render_multiline("<i>\n"), "&lt;i&gt;<br>");
    }

    #[test]
    fn test_moderated_html() {
        let m = ContentModerator::with_default_terms().unwrap();
        assert_eq!(m.moderate("1 < 2\nok").to_html(), "1 &lt; 2<br>ok");
        assert_eq!(m.moderate("debil\n<script>").to_html(), PLACEHOLDER);
    }
}
