//! Section markup sanitizing
//!
//! Model-written section content is reduced to an allow-list of formatting
//! tags. Raw source text placed in fallback documents is escaped instead.

use std::collections::HashSet;

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "b", "i", "u", "ul", "ol", "li", "h3", "h4", "blockquote", "code",
    "pre", "table", "thead", "tbody", "tr", "th", "td", "a", "span",
];

/// Strip every tag and attribute outside the allow-list
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();
    ammonia::Builder::default()
        .tags(tags)
        .clean(html)
        .to_string()
}

/// Escape text for safe inclusion in markup
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wrap raw text in paragraphs: blank lines split paragraphs, single newlines
/// become `<br>`.
pub fn paragraphs_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let lines: Vec<String> = p.lines().map(|line| escape_text(line.trim())).collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
