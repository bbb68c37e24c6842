//! Layered-separator text splitting.
//!
//! Text is cut on the coarsest separator it contains, pieces that are still too long are
//! cut again with the next separator, and adjacent small pieces are merged back into
//! windows of at most `max_size` characters with up to `overlap` characters carried
//! from one window into the next.

use std::collections::VecDeque;

/// Paragraph, line, sentence, word, then raw characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Split `text` into overlapping windows. Lengths are counted in characters.
pub fn split_text(text: &str, separators: &[&str], max_size: usize, overlap: usize) -> Vec<String> {
    let mut out = Vec::new();
    split_into(text, separators, max_size.max(1), overlap, &mut out);
    out
}

fn split_into(text: &str, separators: &[&str], max_size: usize, overlap: usize, out: &mut Vec<String>) {
    let (separator, finer) = pick_separator(text, separators);

    let mut pending: Vec<&str> = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) <= max_size {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            merge_pieces(&pending, max_size, overlap, out);
            pending.clear();
        }

        if finer.is_empty() {
            push_trimmed(piece, out);
        } else {
            split_into(piece, finer, max_size, overlap, out);
        }
    }

    if !pending.is_empty() {
        merge_pieces(&pending, max_size, overlap, out);
    }
}

/// First separator present in the text, plus the finer separators after it.
fn pick_separator<'a, 's>(text: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or(""), &[])
}

/// Split on `separator`, keeping it at the end of the preceding piece.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    text.split_inclusive(separator).filter(|s| !s.is_empty()).collect()
}

/// Greedily pack pieces into windows, keeping a tail of at most `overlap` characters.
fn merge_pieces(pieces: &[&str], max_size: usize, overlap: usize, out: &mut Vec<String>) {
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);

        if total + len > max_size && !window.is_empty() {
            push_window(&window, out);

            while total > overlap || (total > 0 && total + len > max_size) {
                match window.pop_front() {
                    Some(front) => total -= char_len(front),
                    None => break,
                }
            }
        }

        window.push_back(piece);
        total += len;
    }

    push_window(&window, out);
}

fn push_window(window: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = window.iter().copied().collect();
    push_trimmed(&joined, out);
}

fn push_trimmed(text: &str, out: &mut Vec<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_window() {
        let parts = split_text("Un concert ce soir.", DEFAULT_SEPARATORS, 100, 10);
        assert_eq!(parts, vec!["Un concert ce soir.".to_string()]);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let parts = split_text(&text, DEFAULT_SEPARATORS, 50, 0);
        assert_eq!(parts, vec!["a".repeat(40), "b".repeat(40)]);
    }

    #[test]
    fn test_windows_respect_max_size() {
        let text = "Le festival propose des ateliers pour enfants. ".repeat(60);
        let parts = split_text(&text, DEFAULT_SEPARATORS, 120, 20);
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(char_len(part) <= 120, "window too long: {}", char_len(part));
        }
    }

    #[test]
    fn test_consecutive_windows_overlap() {
        let words: Vec<String> = (0..200).map(|i| format!("mot{}", i)).collect();
        let text = words.join(" ");
        let parts = split_text(&text, DEFAULT_SEPARATORS, 100, 30);

        for pair in parts.windows(2) {
            let last_word = pair[0].split(' ').next_back().unwrap();
            assert!(
                pair[1].contains(last_word),
                "'{}' not carried into next window",
                last_word
            );
        }
    }

    #[test]
    fn test_zero_overlap_shares_nothing() {
        let words: Vec<String> = (0..100).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");
        let parts = split_text(&text, DEFAULT_SEPARATORS, 50, 0);

        let rejoined: Vec<&str> = parts.iter().flat_map(|p| p.split(' ')).collect();
        assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_falls_back_to_characters() {
        let text = "x".repeat(250);
        let parts = split_text(&text, DEFAULT_SEPARATORS, 100, 0);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 50);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(90);
        let parts = split_text(&text, DEFAULT_SEPARATORS, 100, 0);
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = "Première phrase. Deuxième phrase.\nNouvelle ligne. ".repeat(30);
        let first = split_text(&text, DEFAULT_SEPARATORS, 80, 15);
        let second = split_text(&text, DEFAULT_SEPARATORS, 80, 15);
        assert_eq!(first, second);
    }
}
