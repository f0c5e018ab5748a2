pub const TRUNCATION_MARKER: &str = "...";
pub const PREVIEW_CHARS: usize = 150;
pub const TITLE_CHARS: usize = 30;

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Texts within `max_words` come back untouched, otherwise the first
/// `max_words` words joined by single spaces plus the marker.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    format!("{}{}", words[..max_words].join(" "), TRUNCATION_MARKER)
}

fn cap_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

pub fn preview(text: &str) -> String {
    cap_chars(text, PREVIEW_CHARS)
}

/// Single-line title for history lists.
pub fn entry_title(prompt: &str) -> String {
    cap_chars(&clean_text(prompt), TITLE_CHARS)
}
