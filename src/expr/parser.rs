//! Pratt parser producing [`Expr`] trees.

use super::ast::{BinaryOp, Expr, Function, Path, UnaryOp, ROOTS};
use super::lexer::{tokenize, Token, TokenKind};
use super::ExprError;

/// Parse an expression, checking roots and function names.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
    };
    let expr = parser.expression(0)?;
    if let Some(token) = parser.peek() {
        return Err(ExprError::Syntax {
            offset: token.offset,
            message: "unexpected trailing input".to_string(),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |t| t.offset)
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ExprError> {
        match self.advance() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(ExprError::Syntax {
                offset: token.offset,
                message: format!("expected {what}"),
            }),
            None => Err(ExprError::Syntax {
                offset: self.end,
                message: format!("expected {what}, found end of input"),
            }),
        }
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.prefix()?;

        while let Some(op) = self.peek().and_then(|t| binary_op(&t.kind)) {
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.advance();
            let rhs = self.expression(precedence)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        let Some(token) = self.advance() else {
            return Err(ExprError::Syntax {
                offset,
                message: "unexpected end of input".to_string(),
            });
        };

        match token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(value)),
            TokenKind::Minus => Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(self.expression(6)?),
            }),
            TokenKind::Bang => Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(self.expression(6)?),
            }),
            TokenKind::LParen => {
                let inner = self.expression(0)?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.identifier(name, token.offset),
            _ => Err(ExprError::Syntax {
                offset: token.offset,
                message: "expected a value".to_string(),
            }),
        }
    }

    fn identifier(&mut self, name: String, offset: usize) -> Result<Expr, ExprError> {
        match name.as_str() {
            "true" => return Ok(Expr::Bool(true)),
            "false" => return Ok(Expr::Bool(false)),
            _ => {}
        }

        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            let function = Function::from_name(&name).ok_or(ExprError::UnknownFunction(name))?;
            self.advance();
            let args = self.arguments()?;
            let (lo, hi) = function.arity();
            if args.len() < lo || args.len() > hi {
                return Err(ExprError::Arity {
                    function: format!("{function:?}").to_lowercase(),
                    found: args.len(),
                });
            }
            return Ok(Expr::Call { function, args });
        }

        if !ROOTS.contains(&name.as_str()) {
            return Err(ExprError::UnknownRoot { name, offset });
        }

        let mut segments = Vec::new();
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
            self.advance();
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Ident(segment),
                    ..
                }) => segments.push(segment),
                Some(token) => {
                    return Err(ExprError::Syntax {
                        offset: token.offset,
                        message: "expected a name after `.`".to_string(),
                    })
                }
                None => {
                    return Err(ExprError::Syntax {
                        offset: self.end,
                        message: "expected a name after `.`".to_string(),
                    })
                }
            }
        }

        Ok(Expr::Path(Path {
            root: name,
            segments,
        }))
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expression(0)?);
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => return Ok(args),
                Some(token) => {
                    return Err(ExprError::Syntax {
                        offset: token.offset,
                        message: "expected `,` or `)`".to_string(),
                    })
                }
                None => {
                    return Err(ExprError::Syntax {
                        offset: self.end,
                        message: "unclosed argument list".to_string(),
                    })
                }
            }
        }
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::OrOr => BinaryOp::Or,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => return None,
    })
}
