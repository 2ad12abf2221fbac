//! Text to Morse conversion.
//!
//! Same table and separators as the device firmware: one trailing space per
//! letter, three spaces between words.

/// Separator emitted for a space in the input.
pub const WORD_GAP: &str = "   ";

/// Morse code for a single character, if it has one.
fn code_for(c: char) -> Option<&'static str> {
    let code = match c {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        _ => return None,
    };
    Some(code)
}

/// Lazily encode `text`, one token per input character.
///
/// Known characters (case-insensitive) map to their code plus a trailing
/// space, a space maps to the three-space word gap, and anything else passes
/// through as itself plus a trailing space. Never fails.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.chars().map(|c| {
        if c == ' ' {
            return WORD_GAP.to_string();
        }
        match code_for(c.to_ascii_uppercase()) {
            Some(code) => format!("{} ", code),
            None => format!("{} ", c),
        }
    })
}

/// Encode `text` to a single Morse string.
pub fn encode(text: &str) -> String {
    tokens(text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_case_insensitive() {
        let text = "Hello World 123";
        assert_eq!(encode(text), encode(&text.to_uppercase()));
    }

    #[test]
    fn encode_empty_is_empty() {
        assert_eq!(encode(""), "");
        assert_eq!(tokens("").count(), 0);
    }

    #[test]
    fn encode_sos() {
        assert_eq!(encode("SOS"), "... --- ... ");
    }

    #[test]
    fn word_gap_is_three_spaces() {
        // ".- " + "   " + "-... "
        assert_eq!(encode("A B"), ".-    -... ");
        assert_eq!(
            tokens("A B").collect::<Vec<_>>(),
            vec![".- ", WORD_GAP, "-... "]
        );
    }

    #[test]
    fn encode_digit() {
        assert_eq!(encode("1"), ".---- ");
    }

    #[test]
    fn unknown_characters_pass_through() {
        assert_eq!(encode("!"), "! ");
        assert_eq!(encode("a!b"), ".- ! -... ");
    }
}
