//! Tokenizer for Malachite assembly text.

use crate::error::AsmError;

/// A single token from an assembly line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// A mnemonic, register (`R3`) or constant name. Always uppercase.
    Word(String),
    /// Unsigned decimal.
    Number(u64),
    /// `0x` literal: raw bits in every slot.
    Hex(u64),
    /// Decimal with a leading minus sign.
    Signed(i64),
    Float(f64),
    Char(char),
}

impl Token {
    /// The token as it would be written back.
    pub(crate) fn text(&self) -> String {
        match self {
            Token::Word(word) => word.clone(),
            Token::Number(n) => n.to_string(),
            Token::Hex(bits) => format!("{bits:#x}"),
            Token::Signed(n) => n.to_string(),
            Token::Float(f) => format!("{f:?}"),
            Token::Char(c) => format!("'{c}'"),
        }
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == ';'
}

fn classify(word: &str, line: usize) -> Result<Token, AsmError> {
    let invalid = || AsmError::InvalidNumber {
        line,
        token: word.to_string(),
    };
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(Token::Hex).map_err(|_| invalid());
    }
    let numeric = word
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    if !numeric {
        return Ok(Token::Word(word.to_uppercase()));
    }
    if let Ok(n) = word.parse::<u64>() {
        return Ok(Token::Number(n));
    }
    if let Ok(n) = word.parse::<i64>() {
        return Ok(Token::Signed(n));
    }
    word.parse::<f64>().map(Token::Float).map_err(|_| invalid())
}

/// Tokenize a single line of assembly text.
///
/// Commas are optional separators. A `;` outside a character literal
/// starts a comment.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == ';' {
            break;
        }
        if c.is_whitespace() || c == ',' {
            i += 1;
            continue;
        }
        if c == '\'' {
            match (chars.get(i + 1), chars.get(i + 2)) {
                (Some(&value), Some('\'')) => {
                    tokens.push(Token::Char(value));
                    i += 3;
                    continue;
                }
                _ => {
                    return Err(AsmError::UnexpectedToken {
                        line: line_num,
                        token: chars[i..].iter().collect(),
                    })
                }
            }
        }
        let start = i;
        while i < chars.len() && !is_separator(chars[i]) {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        tokens.push(classify(&word, line_num)?);
    }

    Ok(tokens)
}
