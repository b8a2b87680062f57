//! Scalar parsers shared by the typed getters.

/// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, ignoring case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Accepts a single character, the names `space`/`tab`, or the escapes `\t`/`\s`.
///
/// Surrounding whitespace is significant only when the value is exactly one
/// whitespace character, so `" "` still parses as a space.
pub fn parse_char(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }
    match raw.trim() {
        "space" | "\\s" => Some(' '),
        "tab" | "\\t" => Some('\t'),
        trimmed => {
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
    }
}

/// Comma-separated characters, each parsed with [`parse_char`].
pub fn parse_char_list(raw: &str) -> Option<Vec<char>> {
    raw.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| parse_char(item.trim()))
        .collect()
}

/// `;`-separated values with empty entries dropped.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
