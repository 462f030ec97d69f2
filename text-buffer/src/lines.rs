use serde::{Deserialize, Serialize};

/// A line's extent in character indices, terminator excluded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct LineSpan {
    /// Index of the line's first character.
    pub start: usize,
    /// Number of characters before the terminator.
    pub len: usize,
}

impl LineSpan {
    /// Index one past the line's last character (the terminator
    /// position, if the line has one).
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Scan a character sequence into line spans.
///
/// `\n`, `\r\n` and bare `\r` each terminate a line; `\r\n` counts as
/// a single terminator. A span is recorded for every terminator-ended
/// segment and for non-empty trailing content, so an empty input has
/// no lines and input ending in a terminator has no trailing empty
/// line.
pub(crate) fn scan(chars: impl Iterator<Item = char>) -> Vec<LineSpan> {
    let mut spans = Vec::new();
    let mut line_start = 0;
    let mut pos = 0;
    // Set after a bare '\r' until the next character decides whether
    // it was '\r' alone or the first half of "\r\n".
    let mut pending_cr = false;

    for ch in chars {
        if pending_cr {
            pending_cr = false;
            if ch == '\n' {
                line_start = pos + 1;
                pos += 1;
                continue;
            }
            line_start = pos;
        }
        match ch {
            '\n' => {
                spans.push(LineSpan {
                    start: line_start,
                    len: pos - line_start,
                });
                line_start = pos + 1;
            }
            '\r' => {
                spans.push(LineSpan {
                    start: line_start,
                    len: pos - line_start,
                });
                pending_cr = true;
            }
            _ => {}
        }
        pos += 1;
    }

    if !pending_cr && line_start < pos {
        spans.push(LineSpan {
            start: line_start,
            len: pos - line_start,
        });
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans_of(text: &str) -> Vec<LineSpan> {
        scan(text.chars())
    }

    fn span(start: usize, len: usize) -> LineSpan {
        LineSpan { start, len }
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert_eq!(spans_of(""), vec![]);
    }

    #[test]
    fn lone_newline_is_one_empty_line() {
        assert_eq!(spans_of("\n"), vec![span(0, 0)]);
    }

    #[test]
    fn terminated_line_has_no_trailing_span() {
        assert_eq!(spans_of("abc\n"), vec![span(0, 3)]);
    }

    #[test]
    fn unterminated_tail_is_its_own_line() {
        let spans = spans_of("abc\ndef\nghi");
        assert_eq!(spans, vec![span(0, 3), span(4, 3), span(8, 3)]);
        // Each end lands on the terminator (or one past the tail).
        assert_eq!(
            spans.iter().map(LineSpan::end).collect::<Vec<_>>(),
            vec![3, 7, 11]
        );
    }

    #[test]
    fn crlf_is_a_single_terminator() {
        assert_eq!(
            spans_of("one\r\ntwo\r\n"),
            vec![span(0, 3), span(5, 3)]
        );
    }

    #[test]
    fn bare_cr_terminates_a_line() {
        assert_eq!(
            spans_of("one\rtwo\rthree"),
            vec![span(0, 3), span(4, 3), span(8, 5)]
        );
    }

    #[test]
    fn mixed_terminators_classify_independently() {
        assert_eq!(
            spans_of("a\nb\r\nc\rd"),
            vec![span(0, 1), span(2, 1), span(5, 1), span(7, 1)]
        );
    }

    #[test]
    fn trailing_bare_cr_leaves_no_empty_line() {
        assert_eq!(spans_of("abc\r"), vec![span(0, 3)]);
    }

    #[test]
    fn consecutive_terminators_produce_empty_lines() {
        assert_eq!(
            spans_of("a\n\n\nb"),
            vec![span(0, 1), span(2, 0), span(3, 0), span(4, 1)]
        );
    }

    #[test]
    fn cr_cr_is_two_terminators() {
        assert_eq!(spans_of("a\r\rb"), vec![span(0, 1), span(2, 0), span(3, 1)]);
    }
}
