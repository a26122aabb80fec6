//! Token recognition for span strings.
//!
//! A span string is a run of `<sign?><digits><unit-name>` tokens with
//! optional whitespace after each. The scanner works on one token at a
//! time so the caller can report the exact offset where recognition
//! stops.

/// One recognized token: a signed decimal numeral and the unit name
/// following it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token<'t> {
    /// The numeral, including any leading sign.
    pub(crate) numeral: &'t str,
    /// The unit name, empty for a bare numeral.
    pub(crate) unit: &'t str,
}

/// A token recognizer for a fixed set of unit names.
///
/// Names are tried in descending lexicographic order, so a name that
/// is a prefix of another (`"m"` and `"min"`) cannot shadow the longer
/// one. The empty name is ordered last and matches unconditionally:
/// the numeral scan is greedy, so a bare numeral can never be followed
/// by a digit it should have consumed.
#[derive(Clone, Debug)]
pub(crate) struct Pattern {
    names: Vec<String>,
}

impl Pattern {
    pub(crate) fn new<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        let mut names: Vec<String> = names.map(String::from).collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        Self { names }
    }

    /// Recognizes one token starting at byte offset `pos`, returning
    /// the token and the offset just past it and any trailing
    /// whitespace. `None` when no token starts at `pos`.
    pub(crate) fn token_at<'t>(&self, text: &'t str, pos: usize) -> Option<(Token<'t>, usize)> {
        let bytes = text.as_bytes();
        let mut end = pos;
        if matches!(bytes.get(end), Some(&b'+') | Some(&b'-')) {
            end += 1;
        }
        let digits = end;
        while matches!(bytes.get(end), Some(b) if b.is_ascii_digit()) {
            end += 1;
        }
        if end == digits {
            return None;
        }
        let numeral = &text[pos..end];
        let unit = self.name_at(text, end)?;
        end += unit.len();
        for ch in text[end..].chars() {
            if !ch.is_whitespace() {
                break;
            }
            end += ch.len_utf8();
        }
        Some((Token { numeral, unit }, end))
    }

    /// The first name in order that matches at byte offset `pos`.
    fn name_at<'t>(&self, text: &'t str, pos: usize) -> Option<&'t str> {
        let rest = &text[pos..];
        for name in &self.names {
            if name.is_empty() || rest.starts_with(name.as_str()) {
                return Some(&rest[..name.len()]);
            }
        }
        None
    }
}
