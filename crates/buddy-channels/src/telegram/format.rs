//! Markdown-ish model output to Telegram HTML.
//!
//! Supports fenced code blocks, `---` rules, `#` headings, inline links,
//! `**bold**` and `*italic*`. Everything else is HTML-escaped. Each line is
//! escaped once, before the inline substitutions run, so captured text is
//! never escaped twice.

use regex::Regex;
use std::sync::LazyLock;

/// Replies longer than this (in characters) are collapsed into an
/// expandable quote.
pub const EXPANDABLE_THRESHOLD: usize = 300;

static HR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{3,}$").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.+?)\]\((https?://[^\s)]+)\)").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));

/// Escape text for Telegram HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert model output to Telegram HTML.
pub fn format_html(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut in_code = false;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            out.push_str(if in_code {
                "</code></pre>"
            } else {
                "<pre><code>"
            });
            in_code = !in_code;
        } else if in_code {
            out.push_str(&escape_html(line));
        } else if HR_RE.is_match(trimmed) {
            out.push_str("<b>");
            out.push_str(&"&mdash;".repeat(trimmed.len()));
            out.push_str("</b>");
        } else if trimmed.starts_with('#') {
            out.push_str("<b>");
            out.push_str(&escape_html(trimmed.trim_start_matches('#').trim()));
            out.push_str("</b>");
        } else {
            out.push_str(&format_inline(&escape_html(line)));
        }

        if i < last {
            out.push('\n');
        }
    }

    if in_code {
        out.push_str("</code></pre>");
    }
    out
}

/// Apply link, bold and italic substitutions to an already escaped line.
fn format_inline(escaped: &str) -> String {
    let linked = LINK_RE.replace_all(escaped, r#"<a href="$2">$1</a>"#);
    let bold = BOLD_RE.replace_all(&linked, "<b>$1</b>");
    ITALIC_RE.replace_all(&bold, "<i>$1</i>").into_owned()
}

/// Render a reply in rich mode, collapsing long replies into an
/// expandable quote.
pub fn render_rich(text: &str) -> String {
    let html = format_html(text);
    if text.chars().count() > EXPANDABLE_THRESHOLD {
        format!("<blockquote expandable=\"true\">{html}</blockquote>")
    } else {
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_plain_text() {
        assert_eq!(format_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }

    #[test]
    fn test_bold_italic_and_link() {
        assert_eq!(
            format_html("**bold** and *it* see [docs](https://x.org/a?b=1&c=2)"),
            "<b>bold</b> and <i>it</i> see <a href=\"https://x.org/a?b=1&amp;c=2\">docs</a>"
        );
    }

    #[test]
    fn test_captured_text_escaped_once() {
        assert_eq!(format_html("**a & b**"), "<b>a &amp; b</b>");
        assert_eq!(format_html("[<x>](https://e.com)"), "<a href=\"https://e.com\">&lt;x&gt;</a>");
    }

    #[test]
    fn test_non_http_link_left_alone() {
        assert_eq!(format_html("[x](ftp://e.com)"), "[x](ftp://e.com)");
    }

    #[test]
    fn test_heading_becomes_bold() {
        assert_eq!(format_html("## Title <1>"), "<b>Title &lt;1&gt;</b>");
    }

    #[test]
    fn test_horizontal_rule() {
        assert_eq!(
            format_html("above\n----\nbelow"),
            "above\n<b>&mdash;&mdash;&mdash;&mdash;</b>\nbelow"
        );
    }

    #[test]
    fn test_code_block_verbatim() {
        let input = "before\n```rust\nlet x = **y** < 3;\n```\nafter";
        assert_eq!(
            format_html(input),
            "before\n<pre><code>\nlet x = **y** &lt; 3;\n</code></pre>\nafter"
        );
    }

    #[test]
    fn test_unclosed_code_block_closed() {
        assert_eq!(format_html("```\ncode"), "<pre><code>\ncode</code></pre>");
    }

    #[test]
    fn test_render_rich_short_reply_not_quoted() {
        assert_eq!(render_rich("hi"), "hi");
    }

    #[test]
    fn test_render_rich_long_reply_quoted() {
        let long = "а".repeat(EXPANDABLE_THRESHOLD + 1);
        let html = render_rich(&long);
        assert!(html.starts_with("<blockquote expandable=\"true\">"));
        assert!(html.ends_with("</blockquote>"));

        // Exactly at the threshold, counted in characters not bytes.
        let edge = "а".repeat(EXPANDABLE_THRESHOLD);
        assert_eq!(render_rich(&edge), edge);
    }
}
