//! A reader for value literals.
//!
//! ```text
//! values  := (value ("," value)* ","?)?
//! value   := atom postfix*
//! atom    := "None" | "true" | "false" | INT | FLOAT | STRING | "[" values "]"
//! postfix := "[" INT "]" | "[" INT? ":" INT? "]"
//! ```
//!
//! Every literal is built with the runtime constructors, and postfix indexing goes through the
//! runtime's `get`/`get_range`, so out-of-range access behaves exactly as in compiled code.

use std::ops::Range;

use kiln_runtime::{Runtime, Val};
use logos::{Lexer, Logos};
use thiserror::Error;

pub type Span = Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// Anything that doesn't match, including integers that overflow and bad escapes
    #[error]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Error,

    #[token("None")]
    NoneKw,
    #[token("true")]
    TrueKw,
    #[token("false")]
    FalseKw,

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse().ok())]
    Int(i64),
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse().ok())]
    Float(f64),
    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    Str(String),

    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

/// Strip the quotes of a string token and resolve its escapes.
fn unescape(lex: &mut Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected `{found}` at {span:?}")]
    Unexpected { found: String, span: Span },

    #[error("unexpected end of input")]
    Eof,

    #[error("cannot index into a value of type {ty} at {span:?}")]
    NotIndexable { ty: &'static str, span: Span },
}

/// Read a comma-separated list of values from `src`.
pub fn read_values(rt: &Runtime, src: &str) -> Result<Vec<Val>, ParseError> {
    let mut reader = Reader::new(rt, src);
    let values = reader.values(None)?;
    match reader.bump() {
        Some((_, span)) => Err(reader.unexpected(span)),
        None => Ok(values),
    }
}

struct Reader<'src, 'rt> {
    rt: &'rt Runtime,
    src: &'src str,
    lexer: std::iter::Peekable<logos::SpannedIter<'src, Token>>,
}

impl<'src, 'rt> Reader<'src, 'rt> {
    fn new(rt: &'rt Runtime, src: &'src str) -> Self {
        Reader {
            rt,
            src,
            lexer: Token::lexer(src).spanned().peekable(),
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        self.lexer.peek().map(|(tok, _)| tok)
    }

    fn peek_is(&mut self, tok: &Token) -> bool {
        self.peek() == Some(tok)
    }

    fn bump(&mut self) -> Option<(Token, Span)> {
        self.lexer.next()
    }

    fn unexpected(&self, span: Span) -> ParseError {
        ParseError::Unexpected {
            found: self.src[span.clone()].to_owned(),
            span,
        }
    }

    fn expect(&mut self, tok: Token) -> Result<Span, ParseError> {
        match self.bump() {
            Some((t, span)) if t == tok => Ok(span),
            Some((_, span)) => Err(self.unexpected(span)),
            None => Err(ParseError::Eof),
        }
    }

    /// Values up to `close`, or to the end of input if there is no closing token.
    fn values(&mut self, close: Option<&Token>) -> Result<Vec<Val>, ParseError> {
        let mut values = vec![];
        loop {
            if self.peek() == close {
                break;
            }
            values.push(self.value()?);
            if !self.peek_is(&Token::Comma) {
                break;
            }
            self.bump();
        }
        Ok(values)
    }

    fn value(&mut self) -> Result<Val, ParseError> {
        let mut value = self.atom()?;
        while self.peek_is(&Token::LBracket) {
            value = self.postfix(value)?;
        }
        Ok(value)
    }

    fn atom(&mut self) -> Result<Val, ParseError> {
        let rt = self.rt;
        let (tok, span) = self.bump().ok_or(ParseError::Eof)?;
        let value = match tok {
            Token::NoneKw => rt.make_none(),
            Token::TrueKw => rt.make_bool(true),
            Token::FalseKw => rt.make_bool(false),
            Token::Int(v) => rt.make_int(v),
            Token::Float(v) => rt.make_float(v),
            Token::Str(s) => rt.make_string(s).into(),
            Token::LBracket => {
                let items = self.values(Some(&Token::RBracket))?;
                self.expect(Token::RBracket)?;
                rt.make_array(items).into()
            }
            _ => return Err(self.unexpected(span)),
        };
        Ok(value)
    }

    fn endpoint(&mut self) -> Option<i64> {
        let v = match self.peek() {
            Some(Token::Int(v)) => *v,
            _ => return None,
        };
        self.bump();
        Some(v)
    }

    fn postfix(&mut self, target: Val) -> Result<Val, ParseError> {
        let rt = self.rt;
        let open = self.expect(Token::LBracket)?;

        let start = self.endpoint();
        let range = if self.peek_is(&Token::Colon) {
            self.bump();
            Some(self.endpoint())
        } else {
            None
        };
        let close = self.expect(Token::RBracket)?;
        let span = open.start..close.end;

        let value = match (range, start) {
            (Some(end), start) => {
                let (start, end) = (start.unwrap_or(0), end.unwrap_or(i64::MAX));
                match &target {
                    Val::String(s) => s.get_range(rt, start, end).into(),
                    Val::Array(a) => a.get_range(rt, start, end).into(),
                    _ => return Err(not_indexable(&target, span)),
                }
            }
            (None, Some(index)) => match &target {
                Val::String(s) => s.get(rt, index),
                Val::Array(a) => a.get(rt, index),
                _ => return Err(not_indexable(&target, span)),
            },
            // `[]` with nothing inside
            (None, None) => return Err(self.unexpected(close)),
        };
        Ok(value)
    }
}

fn not_indexable(target: &Val, span: Span) -> ParseError {
    ParseError::NotIndexable {
        ty: target.kind_name(),
        span,
    }
}
