//! Overlapping character windows with sentence-aware cut points.

use crate::config::BOUNDARY_THRESHOLD;

/// A window of page text with its position in the source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    /// Index of this window among the emitted windows of the page (0-based)
    pub index: usize,
    /// Trimmed window text
    pub text: String,
    /// Character offset where the window starts in the page text
    pub start_char: usize,
    /// Character offset one past the window end
    pub end_char: usize,
}

/// Splits `text` into windows of at most `chunk_size` characters.
///
/// When a window would end before the end of the text, the cut moves back to
/// the last `.`/`!`/`?` followed by a space, or the last newline, provided it
/// sits at or beyond 70% of `chunk_size`. The terminator stays with the
/// window. The next window starts `chunk_overlap` characters before the
/// actual end. Whitespace-only windows are dropped and do not consume an
/// index.
///
/// Offsets count chars, not bytes. Callers validate that
/// `chunk_overlap < chunk_size`; progress is enforced regardless.
pub fn split_windows(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<TextWindow> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let chunk_size = chunk_size.max(1);
    let min_break = BOUNDARY_THRESHOLD * chunk_size as f32;

    let mut windows = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + chunk_size).min(total);

        if end < total {
            if let Some(break_point) = last_break(&chars[start..end]) {
                if break_point as f32 >= min_break {
                    end = start + break_point + 1;
                }
            }
        }

        let content: String = chars[start..end].iter().collect();
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            windows.push(TextWindow {
                index: windows.len(),
                text: trimmed.to_string(),
                start_char: start,
                end_char: end,
            });
        }

        if end >= total {
            break;
        }
        start = end.saturating_sub(chunk_overlap).max(start + 1);
    }

    windows
}

/// Position of the last sentence terminator followed by a space, or the
/// last newline, whichever is later.
fn last_break(window: &[char]) -> Option<usize> {
    let sentence_end = window
        .windows(2)
        .rposition(|pair| matches!(pair[0], '.' | '!' | '?') && pair[1] == ' ');
    let newline = window.iter().rposition(|c| *c == '\n');
    sentence_end.max(newline)
}
