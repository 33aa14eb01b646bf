use std::fmt;
use std::ops::Range;

/// Line context for the most recent token consumed by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHighlight {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    pub line_text: String,
    pub pointer_line: String,
}

impl ErrorHighlight {
    /// Locate the start of `span` in `source`.
    pub fn from_span(source: &str, span: Range<usize>) -> Option<Self> {
        if source.is_empty() {
            return None;
        }

        let mut offset = span.start.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let line_start = source[..offset].rfind('\n').map(|pos| pos + 1).unwrap_or(0);
        let line_end = source[offset..]
            .find('\n')
            .map(|pos| offset + pos)
            .unwrap_or(source.len());
        let line = source[..line_start].matches('\n').count() + 1;

        let prefix = &source[line_start..offset];
        let column = prefix.chars().count() + 1;
        let pointer_line: String = prefix
            .chars()
            .map(|ch| if ch == '\t' { '\t' } else { ' ' })
            .chain(std::iter::once('^'))
            .collect();

        Some(ErrorHighlight {
            line,
            column,
            line_text: source[line_start..line_end].trim_end_matches('\r').to_owned(),
            pointer_line,
        })
    }
}

impl fmt::Display for ErrorHighlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} column {}\n{}\n{}",
            self.line, self.column, self.line_text, self.pointer_line
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_points_at_token() {
        let source = "#usda 1.0\ndef \"A\" {\n\tint64 x = oops\n}";
        let start = source.find("oops").unwrap();
        let highlight = ErrorHighlight::from_span(source, start..start + 4).unwrap();

        assert_eq!(highlight.line, 3);
        assert_eq!(highlight.column, 12);
        assert_eq!(highlight.line_text, "\tint64 x = oops");
        assert_eq!(highlight.pointer_line, "\t          ^");
    }

    #[test]
    fn empty_source_has_no_highlight() {
        assert!(ErrorHighlight::from_span("", 0..0).is_none());
    }
}
