//! Line normalization and word tokenization (§4.1).
//!
//! New code grounded on `original_source/src/gcode_parser.c`'s
//! normalize-then-tokenize structure. The leading-zero stripper fixes
//! the confirmed pointer bug from the original (advancing the write
//! pointer without the read pointer in one branch, which would corrupt
//! a block like `G007`) — see `SPEC_FULL.md` §16.

use crate::error::InputError;

/// A line after normalization: whitespace/control characters stripped,
/// letters upper-cased, leading zeros stripped, comments extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBlock {
    pub text: String,
    pub block_delete: bool,
    /// Content of an `MSG,...` comment, if one was present.
    pub message: Option<String>,
}

/// One `<letter><value>` word. `value` is either a literal number or an
/// unevaluated bracketed expression (§4.2), resolved by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub letter: char,
    pub value: WordValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordValue {
    Number(f64),
    /// Raw text of a `[...]` expression, including the brackets.
    Expr(String),
}

/// Normalise one text line (§4.1): strip whitespace/control chars,
/// upper-case letters, isolate `(`/`;` comments, detect block-delete.
pub fn normalize(line: &str) -> NormalizedBlock {
    let trimmed_start = line.trim_start();
    let block_delete = trimmed_start.starts_with('/');
    let content = if block_delete {
        &trimmed_start[1..]
    } else {
        trimmed_start
    };

    let mut out = String::with_capacity(content.len());
    let mut message = None;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' => {
                let mut comment = String::new();
                for cc in chars.by_ref() {
                    if cc == ')' {
                        break;
                    }
                    comment.push(cc);
                }
                capture_message(&comment, &mut message);
            }
            ';' => {
                let comment: String = chars.by_ref().collect();
                capture_message(&comment, &mut message);
                break;
            }
            c if c.is_whitespace() || c.is_control() => {}
            c => out.push(c.to_ascii_uppercase()),
        }
    }

    NormalizedBlock {
        text: strip_leading_zeros(&out),
        block_delete,
        message,
    }
}

fn capture_message(comment: &str, message: &mut Option<String>) {
    let upper = comment.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("MSG,") {
        let start = comment.len() - rest.len();
        *message = Some(comment[start..].to_string());
    }
}

/// Strip leading zeros from the numeric run following every letter,
/// keeping read and write pointers locked together (the original's
/// bug let them drift apart — see module docs).
fn strip_leading_zeros(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if !c.is_ascii_alphabetic() {
            continue;
        }
        while i < chars.len() && chars[i] == '0' {
            let mut j = i;
            while j < chars.len() && chars[j] == '0' {
                j += 1;
            }
            let more_digits = j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.');
            if more_digits {
                i = j;
            } else {
                break;
            }
        }
    }
    out
}

/// Tokenize a normalized block into `<letter><value>` words (§4.1).
pub fn tokenize_words(text: &str) -> Result<Vec<RawWord>, InputError> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut words = Vec::new();

    while i < chars.len() {
        let letter = chars[i];
        if !letter.is_ascii_alphabetic() {
            return Err(InputError::MalformedCommand);
        }
        i += 1;

        if chars.get(i) == Some(&'[') {
            let start = i;
            let mut depth = 0i32;
            loop {
                match chars.get(i) {
                    Some('[') => {
                        depth += 1;
                        i += 1;
                    }
                    Some(']') => {
                        depth -= 1;
                        i += 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    Some(_) => i += 1,
                    None => return Err(InputError::UnterminatedVariable),
                }
            }
            let expr_text: String = chars[start..i].iter().collect();
            words.push(RawWord {
                letter,
                value: WordValue::Expr(expr_text),
            });
            continue;
        }

        let start = i;
        if matches!(chars.get(i), Some('-') | Some('+')) {
            i += 1;
        }
        while matches!(chars.get(i), Some(c) if c.is_ascii_digit() || *c == '.') {
            i += 1;
        }
        if start == i {
            return Err(InputError::BadNumber(start));
        }
        let num_text: String = chars[start..i].iter().collect();
        let value: f64 = num_text
            .parse()
            .map_err(|_| InputError::BadNumber(start))?;
        words.push(RawWord {
            letter,
            value: WordValue::Number(value),
        });
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_cases_and_strips_whitespace() {
        let n = normalize(" g0 x10 y20 \n");
        assert_eq!(n.text, "G0X10Y20");
        assert!(!n.block_delete);
    }

    #[test]
    fn detects_block_delete() {
        let n = normalize("/G0 X10");
        assert!(n.block_delete);
        assert_eq!(n.text, "G0X10");
    }

    #[test]
    fn strips_paren_comment() {
        let n = normalize("G0 X10 (rapid move) Y20");
        assert_eq!(n.text, "G0X10Y20");
        assert!(n.message.is_none());
    }

    #[test]
    fn semicolon_comment_terminates_block() {
        let n = normalize("G0 X10 ; trailing comment G1");
        assert_eq!(n.text, "G0X10");
    }

    #[test]
    fn msg_comment_is_captured() {
        let n = normalize("G0 X10 (MSG,tool change needed)");
        assert_eq!(n.message.as_deref(), Some("tool change needed"));
    }

    #[test]
    fn leading_zeros_are_stripped_without_corruption() {
        // G007 must become G7, not lose the rest of the line.
        let n = normalize("G007 X0010 Y20");
        assert_eq!(n.text, "G7X10Y20");
    }

    #[test]
    fn lone_zero_value_is_preserved() {
        let n = normalize("G0 X0");
        assert_eq!(n.text, "G0X0");
    }

    #[test]
    fn decimal_leading_zero_preserved() {
        let n = normalize("G1 X0.5");
        assert_eq!(n.text, "G1X0.5");
    }

    #[test]
    fn tokenizes_simple_words() {
        let words = tokenize_words("G1X10Y-20.5").unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], RawWord { letter: 'G', value: WordValue::Number(1.0) });
        assert_eq!(words[2], RawWord { letter: 'Y', value: WordValue::Number(-20.5) });
    }

    #[test]
    fn tokenizes_bracketed_expression() {
        let words = tokenize_words("G1X[1+2]").unwrap();
        assert_eq!(
            words[1],
            RawWord { letter: 'X', value: WordValue::Expr("[1+2]".to_string()) }
        );
    }

    #[test]
    fn tokenizes_nested_bracketed_expression() {
        let words = tokenize_words("X[[1+2]*3]").unwrap();
        assert_eq!(
            words[0],
            RawWord { letter: 'X', value: WordValue::Expr("[[1+2]*3]".to_string()) }
        );
    }

    #[test]
    fn unterminated_expression_is_an_error() {
        assert!(tokenize_words("X[1+2").is_err());
    }

    #[test]
    fn missing_number_is_an_error() {
        assert!(tokenize_words("XG1").is_err());
    }
}
