//! Tokenizer for rule expressions.
//!
//! Tokens need not be separated by whitespace: `ttau>=min_esl_time+5` and
//! `ttau >= min_esl_time + 5` produce the same tokens.

use crate::{RuleError, RuleResult};

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Num(f64),
    Str(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Is,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn keyword(word: &str) -> Option<Token> {
        Some(match word {
            "True"  | "true"  => Token::True,
            "False" | "false" => Token::False,
            "None"  | "none"  => Token::None,
            "and" => Token::And,
            "or"  => Token::Or,
            "not" => Token::Not,
            "is"  => Token::Is,
            _ => return None,
        })
    }
}

/// Split `src` into tokens.  `line` is only used for error messages.
pub fn tokenize(src: &str, line: usize) -> RuleResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(Token::keyword(&word).unwrap_or(Token::Ident(word)));
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent: 1e6, 2.5E-3.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| RuleError::syntax(line, format!("invalid number {text:?}")))?;
            tokens.push(Token::Num(n));
            continue;
        }

        if c == '\'' || c == '"' {
            let start = i + 1;
            let end = chars[start..]
                .iter()
                .position(|&ch| ch == c)
                .map(|p| start + p)
                .ok_or_else(|| RuleError::syntax(line, "unterminated string literal"))?;
            tokens.push(Token::Str(chars[start..end].iter().collect()));
            i = end + 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => return Err(RuleError::syntax(line, format!("unexpected character {c:?}"))),
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}
