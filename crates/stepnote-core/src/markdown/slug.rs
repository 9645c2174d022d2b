use pulldown_cmark::{Event, Parser};

/// Normalize heading text into an id: lowercase, drop everything except
/// ASCII word characters, whitespace and `-`, then join words with `-`.
///
/// The same function keys the anchor map and names rendered headings, so two
/// headings with the same slug collide.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

/// The text a reader sees for an inline markdown fragment (emphasis, code
/// spans and links reduced to their text).
pub fn plain_text(inline_markdown: &str) -> String {
    let mut out = String::new();
    for event in Parser::new(inline_markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            _ => {}
        }
    }
    out.trim().to_string()
}
