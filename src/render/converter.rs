//! Pluggable markdown + math conversion.

use pulldown_cmark::{html, Options, Parser};

/// Whether the math extension participates in a conversion. The fallback
/// path disables it so a broken formula still renders as plain markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathMode {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// Odd number of unescaped `$` delimiters; the math renderer downstream
    /// cannot typeset the block.
    #[error("unbalanced math delimiters")]
    UnbalancedMath,
}

/// A paragraph-level block to HTML converter. The view layer may swap in a
/// different renderer; the pipeline only relies on this contract.
pub trait MarkupConverter: Send + Sync {
    fn convert(&self, block: &str, math: MathMode) -> Result<String, ConvertError>;
}

/// Default converter: CommonMark with the math extension.
pub struct MathMarkdownConverter;

impl MarkupConverter for MathMarkdownConverter {
    fn convert(&self, block: &str, math: MathMode) -> Result<String, ConvertError> {
        let mut options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        if math == MathMode::Enabled {
            check_math_delimiters(block)?;
            options.insert(Options::ENABLE_MATH);
        }

        let parser = Parser::new_ext(block, options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

fn check_math_delimiters(block: &str) -> Result<(), ConvertError> {
    let mut dollars = 0usize;
    let mut escaped = false;
    for c in block.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '$' => dollars += 1,
            _ => {}
        }
    }
    if dollars % 2 == 0 {
        Ok(())
    } else {
        Err(ConvertError::UnbalancedMath)
    }
}
