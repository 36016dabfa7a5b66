use crate::spec::error::SpecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f64),

    LParen,
    RParen,
    Comma,

    // Chain separator, also the sign of a negative argument.
    Minus,
    Plus,

    Eof,
}

pub(crate) fn lex(input: &str) -> Result<Vec<Token>, SpecError> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        // Number: digits with an optional fraction, or a bare fraction like `.5`.
        let digit_at = |j: usize| j < bytes.len() && bytes[j].is_ascii_digit();
        if digit_at(i) || (c == '.' && digit_at(i + 1)) {
            while digit_at(i) {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'.' && digit_at(i + 1) {
                i += 1;
                while digit_at(i) {
                    i += 1;
                }
            }

            let s = &input[start..i];
            let v: f64 = s
                .parse()
                .map_err(|_| SpecError::new(start, "invalid number"))?;
            out.push(Token {
                kind: TokenKind::Number(v),
                span: Span { start, end: i },
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            i += 1;
            while i < bytes.len() {
                let ch = bytes[i] as char;
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    i += 1;
                } else {
                    break;
                }
            }
            out.push(Token {
                kind: TokenKind::Ident(input[start..i].to_owned()),
                span: Span { start, end: i },
            });
            continue;
        }

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            _ => {
                let ch = input[start..].chars().next().unwrap_or(c);
                return Err(SpecError::new(start, format!("unexpected character '{ch}'")));
            }
        };
        i += 1;
        out.push(Token {
            kind,
            span: Span { start, end: i },
        });
    }

    out.push(Token {
        kind: TokenKind::Eof,
        span: Span {
            start: input.len(),
            end: input.len(),
        },
    });

    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/spec/lexer.rs"]
mod tests;
