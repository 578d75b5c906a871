/// Prepares text for an embedding request.
///
/// Line breaks and tabs become spaces, every other control character is dropped, the
/// result is trimmed and cut to at most `max_chars` characters (on a char boundary).
pub fn clean_input_text(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    cleaned.trim().chars().take(max_chars).collect()
}
