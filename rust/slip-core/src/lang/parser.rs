//! S-expression reader.
//!
//! Recursive descent over tokens.  Every routine allocates its result
//! through the heap and returns the position after the consumed tokens, or
//! a [`ParseError`] carrying a message and the offending byte position.

use thiserror::Error;

use crate::gc::Heap;
use crate::lang::tokenizer::{next_token, Token};
use crate::lang::value::Value;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

fn parse_error(message: impl Into<String>, position: usize) -> ParseError {
    ParseError {
        message: message.into(),
        position,
    }
}

/// Read the first expression in `source` starting at byte `pos`.
/// Returns the value and the position after the consumed tokens.
pub fn read_expr(heap: &mut Heap, source: &str, pos: usize) -> Result<(Value, usize), ParseError> {
    let mut parser = Parser { source, pos };
    let expr = parser.parse_expr(heap)?;
    Ok((expr, parser.pos))
}

/// Read every expression in `source` and wrap them in a proper list.
/// An empty (or comment-only) source yields `nil`.
pub fn read_all(heap: &mut Heap, source: &str) -> Result<Value, ParseError> {
    let mut parser = Parser { source, pos: 0 };
    let mut forms = Vec::new();
    loop {
        let tok = next_token(source, parser.pos);
        if tok.is_empty() {
            break;
        }
        forms.push(parser.parse_expr(heap)?);
    }
    Ok(crate::lang::value::list_from_slice(heap, &forms))
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_expr(&mut self, heap: &mut Heap) -> Result<Value, ParseError> {
        let tok = next_token(self.source, self.pos);
        if tok.is_empty() {
            return Err(parse_error("Unexpected end of input", tok.begin));
        }

        match self.source.as_bytes()[tok.begin] {
            b'(' => self.parse_list(heap, tok),
            b'"' => self.parse_string(heap, tok),
            b'\'' => self.parse_quoted(heap, tok, "quote"),
            b'`' => self.parse_quoted(heap, tok, "quasiquote"),
            b',' => self.parse_quoted(heap, tok, "unquote"),
            b')' => Err(parse_error("Unexpected ')'", tok.begin)),
            b'.' => Err(parse_error("Unexpected '.'", tok.begin)),
            _ => self.parse_atom(heap, tok),
        }
    }

    /// `'x`, `` `x ``, `,x` become `(quote x)`, `(quasiquote x)`,
    /// `(unquote x)`.  The parser does not otherwise treat these specially;
    /// `unquote` outside a `quasiquote` is an evaluator error.
    fn parse_quoted(
        &mut self,
        heap: &mut Heap,
        tok: Token,
        keyword: &str,
    ) -> Result<Value, ParseError> {
        self.pos = tok.end;
        let target = self.parse_expr(heap)?;
        let sym = heap.symbol(keyword);
        let nil = heap.nil();
        let tail = heap.alloc_cons(target, nil);
        Ok(heap.alloc_cons(sym, tail))
    }

    fn parse_list(&mut self, heap: &mut Heap, open: Token) -> Result<Value, ParseError> {
        self.pos = open.end;

        let first = next_token(self.source, self.pos);
        if !first.is_empty() && self.source.as_bytes()[first.begin] == b')' {
            self.pos = first.end;
            return Ok(heap.nil());
        }

        // Build the chain with Void cdrs, stitching each cell as the next
        // element arrives.
        let car = self.parse_expr(heap)?;
        let head = heap.alloc_cons(car, Value::Void);
        let Value::Cons(mut last) = head else {
            unreachable!();
        };

        loop {
            let tok = next_token(self.source, self.pos);
            if tok.is_empty() {
                return Err(parse_error("Expected ')'", tok.begin));
            }
            match self.source.as_bytes()[tok.begin] {
                b')' => {
                    self.pos = tok.end;
                    let nil = heap.nil();
                    heap.set_cdr(last, nil);
                    return Ok(head);
                }
                b'.' => {
                    self.pos = tok.end;
                    let tail = self.parse_expr(heap)?;
                    let close = next_token(self.source, self.pos);
                    if close.is_empty() || self.source.as_bytes()[close.begin] != b')' {
                        return Err(parse_error("Expected ')'", close.begin));
                    }
                    self.pos = close.end;
                    heap.set_cdr(last, tail);
                    return Ok(head);
                }
                _ => {
                    let car = self.parse_expr(heap)?;
                    let cell = heap.alloc_cons(car, Value::Void);
                    heap.set_cdr(last, cell);
                    let Value::Cons(cell_id) = cell else {
                        unreachable!();
                    };
                    last = cell_id;
                }
            }
        }
    }

    /// Scan the string body directly from the source (the token span stops
    /// at the first `"`, which may be an escaped one).
    fn parse_string(&mut self, heap: &mut Heap, tok: Token) -> Result<Value, ParseError> {
        let mut text = String::new();
        let mut chars = self.source[tok.begin + 1..].char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos = tok.begin + 1 + offset + 1;
                    return Ok(heap.string(text));
                }
                '\\' => {
                    let Some((esc_offset, esc)) = chars.next() else {
                        break;
                    };
                    match esc {
                        'n' => text.push('\n'),
                        'r' => text.push('\r'),
                        't' => text.push('\t'),
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        _ => {
                            return Err(parse_error(
                                "Invalid escaped character",
                                tok.begin + 1 + esc_offset,
                            ))
                        }
                    }
                }
                other => text.push(other),
            }
        }

        Err(parse_error("Unclosed string", tok.begin))
    }

    /// Numeric-or-symbol classification: a token starting with `-` or a
    /// digit is an integer if it fully parses as one, otherwise a real if
    /// it fully parses as one, otherwise (like every other token) a symbol.
    fn parse_atom(&mut self, heap: &mut Heap, tok: Token) -> Result<Value, ParseError> {
        self.pos = tok.end;
        let text = tok.text(self.source);

        let first = text.as_bytes()[0];
        if first == b'-' || first.is_ascii_digit() {
            if let Ok(num) = text.parse::<i64>() {
                return Ok(heap.integer(num));
            }
            if let Ok(num) = text.parse::<f32>() {
                return Ok(heap.real(num));
            }
        }

        Ok(heap.symbol(text))
    }
}

/// Render a parse error as the offending source line, a caret under the
/// error position, and the message.
pub fn render_parse_error(source: &str, error: &ParseError) -> String {
    let position = error.position.min(source.len());
    let line_start = source[..position].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[position..]
        .find('\n')
        .map_or(source.len(), |i| position + i);
    let line_number = source[..position].matches('\n').count() + 1;
    let column = position - line_start + 1;

    let mut out = format!("Parse error at line {}, column {}:\n", line_number, column);
    out.push_str(&source[line_start..line_end]);
    out.push('\n');
    for _ in 1..column {
        out.push(' ');
    }
    out.push_str("^\n");
    out.push_str(&error.message);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
