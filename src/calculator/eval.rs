//! Arithmetic over `+ - * / %`, unary signs and parentheses, evaluated as
//! `f64` with the usual precedence and left associativity.

use anyhow::{bail, Context, Result};

pub fn evaluate(input: &str) -> Result<f64> {
    let mut parser = Parser {
        src: input.as_bytes(),
        pos: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        bail!("empty expression");
    }
    let value = parser.expr()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        bail!("unexpected '{}' at {}", c as char, parser.pos);
    }
    if !value.is_finite() {
        bail!("result is not a finite number");
    }
    Ok(value)
}

/// Number printing: integral values without a fraction, everything else in
/// the shortest form that reads back to the same value.
pub fn format_number(value: f64) -> String {
    // Collapse -0 so "0-0" doesn't print a sign.
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{}", value)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consume `c` if it is the next non-blank byte.
    fn eat(&mut self, c: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<f64> {
        let mut acc = self.term()?;
        loop {
            if self.eat(b'+') {
                acc += self.term()?;
            } else if self.eat(b'-') {
                acc -= self.term()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut acc = self.unary()?;
        loop {
            if self.eat(b'*') {
                acc *= self.unary()?;
            } else if self.eat(b'/') {
                acc /= self.unary()?;
            } else if self.eat(b'%') {
                acc %= self.unary()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        if self.eat(b'-') {
            Ok(-self.unary()?)
        } else if self.eat(b'+') {
            self.unary()
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<f64> {
        if self.eat(b'(') {
            let value = self.expr()?;
            if !self.eat(b')') {
                bail!("missing ')' at {}", self.pos);
            }
            return Ok(value);
        }
        self.number()
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        if start == self.pos {
            match self.peek() {
                Some(c) => bail!("unexpected '{}' at {}", c as char, self.pos),
                None => bail!("expression ends early"),
            }
        }
        let literal = std::str::from_utf8(&self.src[start..self.pos]).context("number literal")?;
        literal
            .parse::<f64>()
            .with_context(|| format!("bad number '{}'", literal))
    }
}
