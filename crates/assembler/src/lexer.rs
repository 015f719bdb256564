//! Line splitting for vmlab assembly text.
//!
//! A line is `label: label: mnemonic parameter ; comment`, where every part
//! is optional. The parameter is everything between the mnemonic and the
//! comment, trimmed; instruction parsers decide how to read it.

use crate::error::AsmError;

/// The parts of one source line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct SourceLine<'a> {
    /// Labels defined on this line, in order.
    pub labels: Vec<&'a str>,
    /// The mnemonic, lowercased.
    pub mnemonic: Option<String>,
    pub param: Option<&'a str>,
}

/// Split one line of assembly text.
///
/// Blank lines and comment-only lines yield an empty [`SourceLine`].
pub(crate) fn split_line(line: &str, line_num: usize) -> Result<SourceLine<'_>, AsmError> {
    let line = match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    };

    let mut parsed = SourceLine::default();
    let mut rest = line.trim();
    while !rest.is_empty() {
        let (word, after) = split_word(rest);
        match word.strip_suffix(':') {
            Some("") => {
                return Err(AsmError::InvalidLabel {
                    line: line_num,
                    token: word.to_string(),
                })
            }
            Some(name) => {
                parsed.labels.push(name);
                rest = after;
            }
            None => {
                parsed.mnemonic = Some(word.to_lowercase());
                parsed.param = Some(after).filter(|p| !p.is_empty());
                break;
            }
        }
    }

    Ok(parsed)
}

/// First whitespace-separated word and the trimmed remainder.
pub(crate) fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line() {
        assert_eq!(split_line("", 1).unwrap(), SourceLine::default());
    }

    #[test]
    fn whitespace_only() {
        assert_eq!(split_line("   \t  ", 1).unwrap(), SourceLine::default());
    }

    #[test]
    fn comment_only() {
        assert_eq!(
            split_line("; this is a comment", 1).unwrap(),
            SourceLine::default()
        );
    }

    #[test]
    fn bare_mnemonic() {
        let line = split_line("apply", 1).unwrap();
        assert_eq!(line.mnemonic.as_deref(), Some("apply"));
        assert_eq!(line.param, None);
        assert!(line.labels.is_empty());
    }

    #[test]
    fn mnemonic_is_lowercased() {
        let line = split_line("  PUSHLOC 2", 1).unwrap();
        assert_eq!(line.mnemonic.as_deref(), Some("pushloc"));
        assert_eq!(line.param, Some("2"));
    }

    #[test]
    fn parameter_is_rest_of_line() {
        let line = split_line("mkfunval L3   fac ; build fac", 1).unwrap();
        assert_eq!(line.mnemonic.as_deref(), Some("mkfunval"));
        assert_eq!(line.param, Some("L3   fac"));
    }

    #[test]
    fn label_alone() {
        let line = split_line("append/3:", 1).unwrap();
        assert_eq!(line.labels, vec!["append/3"]);
        assert_eq!(line.mnemonic, None);
    }

    #[test]
    fn labels_before_instruction() {
        let line = split_line("L1: L2: eval", 1).unwrap();
        assert_eq!(line.labels, vec!["L1", "L2"]);
        assert_eq!(line.mnemonic.as_deref(), Some("eval"));
    }

    #[test]
    fn lone_colon_is_invalid() {
        assert_eq!(
            split_line("  : halt", 6).unwrap_err(),
            AsmError::InvalidLabel {
                line: 6,
                token: ":".to_string()
            }
        );
    }

    #[test]
    fn split_word_trims_remainder() {
        assert_eq!(split_word("L4  2 "), ("L4", "2"));
        assert_eq!(split_word("halt"), ("halt", ""));
    }
}
