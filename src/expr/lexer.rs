//! Tokenizer for rule expressions.
//!
//! Word operators (`and`, `or`, `not`, `lt`, `le`, `gt`, `ge`, `eq`, `ne`)
//! are accepted next to the symbolic ones so expressions can be written in
//! markup attributes without escaping `<` and `&`. Identifiers may contain
//! `-` because property ids are kebab-case, so subtraction between two names
//! needs whitespace around the operator.

use super::ExprError;

/// A lexical token with its byte offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() {
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            let text = &source[start..pos];
            let value = text.parse::<f64>().map_err(|_| ExprError::Syntax {
                offset: start,
                message: format!("invalid number `{text}`"),
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                offset: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len()
                && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'-')
            {
                pos += 1;
            }
            let word = &source[start..pos];
            let kind = match word {
                "and" => TokenKind::AndAnd,
                "or" => TokenKind::OrOr,
                "not" => TokenKind::Bang,
                "lt" => TokenKind::Lt,
                "le" => TokenKind::Le,
                "gt" => TokenKind::Gt,
                "ge" => TokenKind::Ge,
                "eq" => TokenKind::EqEq,
                "ne" => TokenKind::NotEq,
                _ => TokenKind::Ident(word.to_string()),
            };
            tokens.push(Token { kind, offset: start });
            continue;
        }

        let next = bytes.get(pos + 1).copied();
        let (kind, width) = match (c, next) {
            (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
            (b'<', Some(b'=')) => (TokenKind::Le, 2),
            (b'>', Some(b'=')) => (TokenKind::Ge, 2),
            (b'&', Some(b'&')) => (TokenKind::AndAnd, 2),
            (b'|', Some(b'|')) => (TokenKind::OrOr, 2),
            (b'<', _) => (TokenKind::Lt, 1),
            (b'>', _) => (TokenKind::Gt, 1),
            (b'!', _) => (TokenKind::Bang, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'%', _) => (TokenKind::Percent, 1),
            _ => {
                return Err(ExprError::Syntax {
                    offset: start,
                    message: format!("unexpected character `{}`", c as char),
                })
            }
        };
        tokens.push(Token { kind, offset: start });
        pos += width;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers_and_paths() {
        assert_eq!(
            kinds("target.morale >= 2.5"),
            vec![
                TokenKind::Ident("target".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("morale".to_string()),
                TokenKind::Ge,
                TokenKind::Number(2.5),
            ]
        );
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(
            kinds("count gt 1 and not value lt 0"),
            vec![
                TokenKind::Ident("count".to_string()),
                TokenKind::Gt,
                TokenKind::Number(1.0),
                TokenKind::AndAnd,
                TokenKind::Bang,
                TokenKind::Ident("value".to_string()),
                TokenKind::Lt,
                TokenKind::Number(0.0),
            ]
        );
    }

    #[test]
    fn test_kebab_case_identifiers() {
        assert_eq!(
            kinds("self.free-will"),
            vec![
                TokenKind::Ident("self".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("free-will".to_string()),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let error = tokenize("1 # 2").unwrap_err();
        assert!(matches!(error, ExprError::Syntax { offset: 2, .. }));
    }
}
