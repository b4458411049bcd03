use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Zero-width, bidirectional-override/isolate and BOM code points that must
/// never survive normalization, independent of the printable filter.
static BIDI_AND_ZERO_WIDTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[\\x{200B}-\\x{200F}\\x{202A}-\\x{202E}\\x{2066}-\\x{2069}\\x{FEFF}]")
        .expect("char class for banned code points should be valid")
});

/// Rewrite a column name: spaces become underscores, parentheses are deleted.
/// No other punctuation is touched.
pub fn canonicalize_column(name: &str) -> String {
    name.replace(' ', "_").replace(['(', ')'], "")
}

/// Format characters (general category Cf). These have no visible glyph, so
/// the printable filter drops them along with controls.
fn is_format_char(c: char) -> bool {
    matches!(c,
        '\u{00AD}'
        | '\u{0600}'..='\u{0605}'
        | '\u{061C}'
        | '\u{06DD}'
        | '\u{070F}'
        | '\u{0890}'..='\u{0891}'
        | '\u{08E2}'
        | '\u{180E}'
        | '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2064}'
        | '\u{2066}'..='\u{206F}'
        | '\u{FEFF}'
        | '\u{FFF9}'..='\u{FFFB}'
        | '\u{110BD}'
        | '\u{110CD}'
        | '\u{13430}'..='\u{1343F}'
        | '\u{1BCA0}'..='\u{1BCA3}'
        | '\u{1D173}'..='\u{1D17A}'
        | '\u{E0001}'
        | '\u{E0020}'..='\u{E007F}')
}

/// Separator characters other than the ordinary ASCII space (Zs/Zl/Zp), plus
/// private-use ranges. None of these render as printable text.
fn is_invisible_separator(c: char) -> bool {
    matches!(c,
        '\u{00A0}'
        | '\u{1680}'
        | '\u{2000}'..='\u{200A}'
        | '\u{2028}'
        | '\u{2029}'
        | '\u{202F}'
        | '\u{205F}'
        | '\u{3000}'
        | '\u{E000}'..='\u{F8FF}'
        | '\u{F0000}'..='\u{FFFFD}'
        | '\u{100000}'..='\u{10FFFD}')
}

fn is_nonprintable(c: char) -> bool {
    if c == ' ' {
        return false;
    }
    c.is_control() || is_format_char(c) || is_invisible_separator(c)
}

/// Remove invisible and non-printable characters from a text value.
///
/// Steps, in order:
/// 1. NFKC normalization (this already folds U+00A0 into a plain space),
/// 2. drop every non-printable character,
/// 3. sweep the explicitly banned zero-width/bidi/BOM code points,
/// 4. map any remaining U+00A0 to a space and delete U+180E.
///
/// Idempotent: applying it twice yields the same value as applying it once.
pub fn strip_invisible(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    let printable: String = normalized.chars().filter(|c| !is_nonprintable(*c)).collect();
    let swept = BIDI_AND_ZERO_WIDTH.replace_all(&printable, "");
    swept.replace('\u{00A0}', " ").replace('\u{180E}', "")
}
