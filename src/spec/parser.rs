use smallvec::SmallVec;

use crate::foundation::error::NetResult;
use crate::spec::ast::{BlockFlags, BlockSpec, OpDescriptor, PadMode, UpsampleAlgo};
use crate::spec::error::SpecError;
use crate::spec::lexer::{Span, Token, TokenKind, lex};

/// Parse a block spec such as `prelu(0.25)-conv(3)-prelu(0.25)-conv(3)+skip`.
///
/// Fails with [`crate::NetError::MalformedSpec`] on unknown keywords, flags or arguments, and
/// on `evenize` anywhere but the first position.
pub fn parse_block_spec(src: &str) -> NetResult<BlockSpec> {
    parse_inner(src).map_err(|e| e.into_net(src))
}

fn parse_inner(src: &str) -> Result<BlockSpec, SpecError> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };

    let mut ops = SmallVec::<[OpDescriptor; 8]>::new();
    loop {
        let (start, op) = p.parse_op()?;
        if matches!(op, OpDescriptor::PadToEven { .. }) && !ops.is_empty() {
            return Err(SpecError::new(
                start,
                "'evenize' is only valid as the first op of a chain",
            ));
        }
        ops.push(op);
        if !p.consume(TokenKind::Minus) {
            break;
        }
    }

    let mut flags = BlockFlags::default();
    while p.consume(TokenKind::Plus) {
        let (span, name) = p.expect_ident()?;
        match name.as_str() {
            "skip" => flags.skip = true,
            "nobias" => flags.no_bias = true,
            "nopad" => flags.no_pad = true,
            other => {
                return Err(SpecError::new(span.start, format!("unknown flag '{other}'")));
            }
        }
    }

    p.expect(TokenKind::Eof)?;
    Ok(BlockSpec { ops, flags })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Arg {
    Ident(String),
    Number(f64),
}

#[derive(Debug, Clone)]
pub(crate) struct SpannedArg {
    pub(crate) arg: Arg,
    pub(crate) start: usize,
}

type OpCtor = fn(usize, &[SpannedArg]) -> Result<OpDescriptor, SpecError>;

/// Keyword to descriptor-constructor registry.
const REGISTRY: &[(&str, OpCtor)] = &[
    ("evenize", make_evenize),
    ("conv", make_conv),
    ("sconv", make_sconv),
    ("up", make_up),
    ("prelu", make_prelu),
];

pub(crate) fn lookup(keyword: &str) -> Option<OpCtor> {
    REGISTRY
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, ctor)| *ctor)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), SpecError> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(SpecError::new(
                self.span().start,
                format!("expected {kind:?}, found {:?}", self.peek().kind),
            ))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<(Span, String), SpecError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(name) => {
                self.bump();
                Ok((tok.span, name))
            }
            other => Err(SpecError::new(
                tok.span.start,
                format!("expected identifier, found {other:?}"),
            )),
        }
    }

    fn parse_op(&mut self) -> Result<(usize, OpDescriptor), SpecError> {
        let (span, keyword) = self.expect_ident()?;
        let ctor = lookup(&keyword).ok_or_else(|| {
            SpecError::new(span.start, format!("unknown keyword '{keyword}'"))
        })?;

        let mut args = Vec::new();
        if self.consume(TokenKind::LParen) && !self.consume(TokenKind::RParen) {
            loop {
                args.push(self.parse_arg()?);
                if self.consume(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }

        Ok((span.start, ctor(span.start, &args)?))
    }

    fn parse_arg(&mut self) -> Result<SpannedArg, SpecError> {
        let start = self.span().start;
        let negative = self.consume(TokenKind::Minus);
        let tok = self.peek().clone();
        let arg = match tok.kind {
            TokenKind::Number(v) => Arg::Number(if negative { -v } else { v }),
            TokenKind::Ident(name) if !negative => Arg::Ident(name),
            other => {
                return Err(SpecError::new(
                    tok.span.start,
                    format!("expected argument, found {other:?}"),
                ));
            }
        };
        self.bump();
        Ok(SpannedArg { arg, start })
    }
}

fn pad_mode_arg(name: &str) -> Option<PadMode> {
    match name {
        "zeropad" => Some(PadMode::Zeros),
        "replpad" => Some(PadMode::Replicate),
        "reflpad" => Some(PadMode::Reflect),
        _ => None,
    }
}

fn unexpected(a: &SpannedArg, keyword: &str) -> SpecError {
    let shown = match &a.arg {
        Arg::Ident(s) => s.clone(),
        Arg::Number(v) => v.to_string(),
    };
    SpecError::new(a.start, format!("unexpected argument '{shown}' for '{keyword}'"))
}

fn make_evenize(_at: usize, args: &[SpannedArg]) -> Result<OpDescriptor, SpecError> {
    let mut pad = PadMode::Zeros;
    for a in args {
        match &a.arg {
            Arg::Ident(s) => pad = pad_mode_arg(s).ok_or_else(|| unexpected(a, "evenize"))?,
            Arg::Number(_) => return Err(unexpected(a, "evenize")),
        }
    }
    Ok(OpDescriptor::PadToEven { pad })
}

/// Largest square kernel a `conv`/`sconv` may request.
pub(crate) const MAX_KERNEL_SIZE: usize = 255;

fn conv_args(keyword: &str, args: &[SpannedArg]) -> Result<(usize, PadMode), SpecError> {
    let mut kernel = 3usize;
    let mut pad = PadMode::Zeros;
    for (i, a) in args.iter().enumerate() {
        match &a.arg {
            Arg::Number(v) if i == 0 => {
                if v.fract() != 0.0 || *v < 1.0 || *v > MAX_KERNEL_SIZE as f64 {
                    return Err(SpecError::new(
                        a.start,
                        format!("'{keyword}' kernel size must be in 1..={MAX_KERNEL_SIZE}, got {v}"),
                    ));
                }
                kernel = *v as usize;
            }
            Arg::Ident(s) => pad = pad_mode_arg(s).ok_or_else(|| unexpected(a, keyword))?,
            Arg::Number(_) => return Err(unexpected(a, keyword)),
        }
    }
    Ok((kernel, pad))
}

fn make_conv(_at: usize, args: &[SpannedArg]) -> Result<OpDescriptor, SpecError> {
    let (kernel, pad) = conv_args("conv", args)?;
    Ok(OpDescriptor::Convolve { kernel, pad })
}

fn make_sconv(_at: usize, args: &[SpannedArg]) -> Result<OpDescriptor, SpecError> {
    let (kernel, pad) = conv_args("sconv", args)?;
    Ok(OpDescriptor::StridedConvolve { kernel, pad })
}

fn make_up(at: usize, args: &[SpannedArg]) -> Result<OpDescriptor, SpecError> {
    let algo = match args {
        [] => UpsampleAlgo::Bilinear,
        [a] => match &a.arg {
            Arg::Ident(s) if s == "nearest" => UpsampleAlgo::Nearest,
            Arg::Ident(s) if s == "bilinear" => UpsampleAlgo::Bilinear,
            Arg::Ident(s) if s == "pyramid" => UpsampleAlgo::Pyramid,
            Arg::Ident(s) if s == "shuffle" => UpsampleAlgo::Shuffle,
            _ => return Err(unexpected(a, "up")),
        },
        _ => return Err(SpecError::new(at, "'up' takes at most one argument")),
    };
    Ok(OpDescriptor::Upsample { algo })
}

fn make_prelu(at: usize, args: &[SpannedArg]) -> Result<OpDescriptor, SpecError> {
    let init = match args {
        [] => 0.25,
        [a] => match a.arg {
            Arg::Number(v) => v as f32,
            Arg::Ident(_) => return Err(unexpected(a, "prelu")),
        },
        _ => return Err(SpecError::new(at, "'prelu' takes at most one argument")),
    };
    Ok(OpDescriptor::ParametricActivation { init })
}

#[cfg(test)]
#[path = "../../tests/unit/spec/parser.rs"]
mod tests;
