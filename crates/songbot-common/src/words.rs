use std::collections::BTreeSet;

/// Invisible characters that chat clients inject into messages, mostly to
/// get around duplicate message filters.
const ZERO_WIDTH: [char; 6] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{E0000}',
];

/// Punctuation that is kept in a sanitized request since it shows up in
/// actual song and artist names.
const ALLOWED_PUNCTUATION: [char; 12] = ['\'', '-', '&', '.', ',', '!', '?', '(', ')', '/', '+', ':'];

/// Sanitize a raw chat request.
///
/// Trims, strips zero-width characters and disallowed punctuation, and
/// collapses whitespace into single spaces. Case is preserved.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for word in input.split_whitespace() {
        let len = out.len();

        if !out.is_empty() {
            out.push(' ');
        }

        out.extend(word.chars().filter(|c| is_allowed(*c)));

        // NB: a word made up entirely of stripped characters leaves nothing.
        if out.len() == len + usize::from(len > 0) {
            out.truncate(len);
        }
    }

    out
}

/// Normalize text into a comparison key.
///
/// The key is lowercase, contains no punctuation at all and has its
/// whitespace collapsed, so that `Don't Stop  Me Now!` and `dont stop me now`
/// compare equal.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for word in input.split_whitespace() {
        let len = out.len();

        if !out.is_empty() {
            out.push(' ');
        }

        out.extend(
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase),
        );

        if out.len() == len + usize::from(len > 0) {
            out.truncate(len);
        }
    }

    out
}

/// The set of distinct normalized words in the given text.
pub fn word_set(input: &str) -> BTreeSet<String> {
    normalize(input)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

fn is_allowed(c: char) -> bool {
    if ZERO_WIDTH.contains(&c) {
        return false;
    }

    c.is_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c)
}

#[cfg(test)]
mod tests {
    use super::{normalize, sanitize, word_set};

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  bohemian   rhapsody  "), "bohemian rhapsody");
        assert_eq!(sanitize("AC/DC - Thunderstruck!"), "AC/DC - Thunderstruck!");
        assert_eq!(sanitize("hello\u{200B}world"), "helloworld");
        assert_eq!(sanitize("song \u{E0000}"), "song");
        assert_eq!(sanitize("<script> song; $$ by ~x~"), "script song by x");
        assert_eq!(sanitize("\t\n "), "");
    }

    #[test]
    fn test_sanitize_unicode() {
        assert_eq!(sanitize("Sigur Rós 👌 Hoppípolla"), "Sigur Rós Hoppípolla");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Don't Stop  Me Now!"), "dont stop me now");
        assert_eq!(normalize("dont stop me now"), "dont stop me now");
        assert_eq!(normalize("  -- Queen -- "), "queen");
        assert_eq!(normalize("ÄNGLAR"), "änglar");
    }

    #[test]
    fn test_word_set() {
        let words = word_set("We Will, we WILL rock you");
        assert_eq!(
            words.into_iter().collect::<Vec<_>>(),
            vec!["rock", "we", "will", "you"]
        );
    }
}
