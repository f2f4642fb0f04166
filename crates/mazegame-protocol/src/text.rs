//! Rules for user-supplied text: nicknames, chat lines and flavor texts.

/// Longest chat text a client may send.
pub const MAX_CHAT_LENGTH: usize = 255;

/// Longest flavor text shown in a `JOIN` line.
pub const MAX_FLAVOR_LENGTH: usize = 255;

const REPLACEMENT: char = '\u{FFFD}';

/// A letter from the Latin script.
///
/// The ranges are the Unicode Latin script assignments, block by block;
/// `is_alphabetic` drops the symbols and modifiers mixed into them.
fn is_latin_letter(c: char) -> bool {
    if !c.is_alphabetic() {
        return false;
    }
    matches!(c as u32,
        // Basic Latin
        0x41..=0x5A
        | 0x61..=0x7A
        // Latin-1 Supplement
        | 0xAA
        | 0xBA
        | 0xC0..=0xD6
        | 0xD8..=0xF6
        // Latin Extended-A and -B, IPA Extensions
        | 0xF8..=0x2AF
        // Spacing Modifier Letters
        | 0x2B0..=0x2B8
        | 0x2E0..=0x2E4
        // Phonetic Extensions and their Supplement
        | 0x1D00..=0x1D25
        | 0x1D2C..=0x1D5C
        | 0x1D62..=0x1D65
        | 0x1D6B..=0x1D77
        | 0x1D79..=0x1DBE
        // Latin Extended Additional
        | 0x1E00..=0x1EFF
        // Superscripts and Subscripts
        | 0x2071
        | 0x207F
        | 0x2090..=0x209C
        // Letterlike Symbols
        | 0x212A..=0x212B
        | 0x2132
        | 0x214E
        // Number Forms
        | 0x2160..=0x2188
        // Latin Extended-C, -D and -E
        | 0x2C60..=0x2C7F
        | 0xA722..=0xA787
        | 0xA78B..=0xA7FF
        | 0xAB30..=0xAB5A
        | 0xAB5C..=0xAB64
        | 0xAB66..=0xAB69
        // Alphabetic Presentation Forms
        | 0xFB00..=0xFB06
        // Fullwidth Latin
        | 0xFF21..=0xFF3A
        | 0xFF41..=0xFF5A
        // Latin Extended-F and -G
        | 0x10780..=0x107BA
        | 0x1DF00..=0x1DF2A)
}

fn is_space_separator(c: char) -> bool {
    matches!(c,
        ' ' | '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}')
}

/// A nickname starts with a Latin letter and continues with Latin letters,
/// ASCII digits, `_` or `-`.
pub fn is_nick_valid(nick: &str) -> bool {
    let mut chars = nick.chars();
    match chars.next() {
        Some(first) if is_latin_letter(first) => {}
        _ => return false,
    }
    chars.all(|c| is_latin_letter(c) || c.is_ascii_digit() || c == '_' || c == '-')
}

fn is_allowed_in_chat(c: char) -> bool {
    is_latin_letter(c)
        || c.is_ascii_digit()
        || is_space_separator(c)
        || (c.is_ascii_punctuation() && c != ';')
}

/// Replaces every character that may not appear in chat with U+FFFD.
///
/// The separator `;` is never allowed, so a sanitized text can always be
/// embedded in an `INFO` line.
pub fn sanitize_chat(text: &str) -> String {
    text.chars()
        .map(|c| if is_allowed_in_chat(c) { c } else { REPLACEMENT })
        .collect()
}

/// Same rules as chat, truncated to [`MAX_FLAVOR_LENGTH`] characters with a
/// trailing `...` when it had to be cut.
pub fn sanitize_flavor(text: &str) -> String {
    let sanitized = sanitize_chat(text);
    if sanitized.chars().count() <= MAX_FLAVOR_LENGTH {
        return sanitized;
    }
    let mut cut: String = sanitized.chars().take(MAX_FLAVOR_LENGTH - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_nick_valid_accepts_latin_names() {
        assert!(is_nick_valid("bob"));
        assert!(is_nick_valid("Zoë_2-x"));
        assert!(is_nick_valid("a"));
    }

    #[test]
    fn test_is_nick_valid_accepts_extended_latin_blocks() {
        // IPA, Phonetic Extensions, Latin Extended-E.
        assert!(is_nick_valid("\u{250}x"));
        assert!(is_nick_valid("\u{1D00}bc"));
        assert!(is_nick_valid("\u{AB30}"));
        // Greek small capital gamma sits in Phonetic Extensions too.
        assert!(!is_nick_valid("\u{1D26}x"));
    }

    #[test]
    fn test_is_nick_valid_rejects_bad_names() {
        assert!(!is_nick_valid(""));
        assert!(!is_nick_valid("1bob"));
        assert!(!is_nick_valid("_bob"));
        assert!(!is_nick_valid("bo b"));
        assert!(!is_nick_valid("bob;x"));
        assert!(!is_nick_valid("Боб"));
    }

    #[test]
    fn test_sanitize_chat_replaces_separator_and_exotic_chars() {
        assert_eq!(sanitize_chat("hi; there!"), "hi\u{FFFD} there!");
        assert_eq!(sanitize_chat("gg 🙂"), "gg \u{FFFD}");
        assert_eq!(sanitize_chat("Ça va?"), "Ça va?");
    }

    #[test]
    fn test_sanitize_flavor_truncates_long_text() {
        let long = "x".repeat(300);
        let flavor = sanitize_flavor(&long);
        assert_eq!(flavor.chars().count(), MAX_FLAVOR_LENGTH);
        assert!(flavor.ends_with("..."));
        assert_eq!(sanitize_flavor("short"), "short");
    }
}
