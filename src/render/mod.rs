//! Render pipeline: debounced text to safe markup, one block at a time.
//!
//! Input splits on blank-line boundaries; each block converts independently
//! so one malformed formula cannot blank the whole document. A failing block
//! is replaced by a visibly flagged fallback rendered with math disabled.
//! Pure function, no state retained between calls.

mod converter;

pub use converter::{ConvertError, MarkupConverter, MathMarkdownConverter, MathMode};

pub fn render(content: &str, converter: &dyn MarkupConverter) -> String {
    let mut out = String::new();
    for block in content.split("\n\n") {
        match converter.convert(block, MathMode::Enabled) {
            Ok(html) => out.push_str(&html),
            Err(err) => {
                log::warn!("render block failed ({err}), using flagged fallback");
                let fallback = converter
                    .convert(block, MathMode::Disabled)
                    .unwrap_or_else(|_| escape_html(block));
                out.push_str("<div style=\"color:red;background-color:yellow\">");
                out.push_str(&fallback);
                out.push_str("</div>");
            }
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
