//! Just enough of a C-like grammar to read call expressions and function
//! prototypes: `name(args)` and `... type name(params) ...`.
//!
//! Argument and parameter lists are split on top-level commas only, so
//! `f(g(a, b), c)` has two arguments and `GpuArray<Real,3> const& dx` is one
//! parameter.

use std::ops::Range;

use crate::error::{Result, RewriteError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Literal,
    Punct(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut chars = src.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        let kind = match c {
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                while chars.next_if(|&(_, c)| c != '\n').is_some() {}
                continue;
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = ' ';
                loop {
                    match chars.next() {
                        Some((_, '/')) if prev == '*' => break,
                        Some((_, c)) => prev = c,
                        None => {
                            return Err(RewriteError::syntax("text", src, "unterminated comment"));
                        }
                    }
                }
                continue;
            }
            '"' | '\'' => {
                let mut escaped = false;
                loop {
                    match chars.next() {
                        Some((_, '\\')) if !escaped => escaped = true,
                        Some((_, q)) if q == c && !escaped => break,
                        Some(_) => escaped = false,
                        None => {
                            return Err(RewriteError::syntax("text", src, "unterminated literal"));
                        }
                    }
                }
                TokenKind::Literal
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                while chars
                    .next_if(|&(_, c)| c == '_' || c.is_ascii_alphanumeric())
                    .is_some()
                {}
                TokenKind::Ident
            }
            c if c.is_ascii_digit() => {
                while chars
                    .next_if(|&(_, c)| c == '_' || c == '.' || c.is_ascii_alphanumeric())
                    .is_some()
                {}
                TokenKind::Number
            }
            c => TokenKind::Punct(c),
        };
        let end = chars.peek().map(|&(idx, _)| idx).unwrap_or(src.len());
        tokens.push(Token { kind, start, end });
    }

    Ok(tokens)
}

/// Recursive-descent walker over one token list.
struct Parser<'a> {
    src: &'a str,
    what: &'static str,
    tokens: &'a [Token],
    pos: usize,
    /// Whether `<` ... `>` nests like a bracket (template arguments).
    angles: bool,
}

/// Contents of one bracketed group: the byte range between the brackets and
/// the byte ranges of its top-level comma-separated items.
struct Group {
    inner: Range<usize>,
    items: Vec<Range<usize>>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, what: &'static str, tokens: &'a [Token], angles: bool) -> Self {
        Self {
            src,
            what,
            tokens,
            pos: 0,
            angles,
        }
    }

    fn error(&self, reason: impl Into<String>) -> RewriteError {
        RewriteError::syntax(self.what, self.src, reason)
    }

    fn closer(&self, tok: &Token) -> Option<char> {
        match tok.kind {
            TokenKind::Punct('(') => Some(')'),
            TokenKind::Punct('[') => Some(']'),
            TokenKind::Punct('{') => Some('}'),
            TokenKind::Punct('<') if self.angles => Some('>'),
            _ => None,
        }
    }

    fn is_stray_closer(&self, tok: &Token) -> bool {
        match tok.kind {
            TokenKind::Punct(')' | ']' | '}') => true,
            TokenKind::Punct('>') => self.angles,
            _ => false,
        }
    }

    /// Parses a group whose opening token sits at `self.pos`, leaving the
    /// cursor just past the matching closer.
    fn group(&mut self) -> Result<Group> {
        let open = self.tokens[self.pos];
        let close_char = self
            .closer(&open)
            .ok_or_else(|| self.error("expected an opening bracket"))?;
        self.pos += 1;

        let inner_start = open.end;
        let mut items = vec![];
        let mut item_start = inner_start;

        loop {
            let tok = match self.tokens.get(self.pos) {
                Some(tok) => *tok,
                None => return Err(self.error(format!("missing `{close_char}`"))),
            };
            if tok.is_punct(close_char) {
                self.pos += 1;
                let inner = inner_start..tok.start;
                if self.tokens_within(&inner).next().is_some() {
                    items.push(item_start..tok.start);
                }
                return Ok(Group {
                    inner,
                    items: items.into_iter().map(|r| self.trimmed(r)).collect(),
                });
            }
            if self.closer(&tok).is_some() {
                self.group()?;
                continue;
            }
            if self.is_stray_closer(&tok) {
                // A lone `>` (as in `->`) closes nothing.
                if tok.is_punct('>') && close_char != '>' {
                    self.pos += 1;
                    continue;
                }
                return Err(self.error(format!("unbalanced `{}`", tok.text(self.src))));
            }
            if tok.is_punct(',') {
                items.push(item_start..tok.start);
                item_start = tok.end;
            }
            self.pos += 1;
        }
    }

    /// Shrinks `range` to the tokens inside it, dropping surrounding
    /// whitespace and comments.
    fn trimmed(&self, range: Range<usize>) -> Range<usize> {
        let mut inside = self.tokens_within(&range);
        match inside.next() {
            Some(first) => {
                let last = inside.last().unwrap_or(first);
                first.start..last.end
            }
            None => range.start..range.start,
        }
    }

    fn tokens_within(&self, range: &Range<usize>) -> impl Iterator<Item = &'a Token> {
        let (start, end) = (range.start, range.end);
        self.tokens
            .iter()
            .filter(move |t| t.start >= start && t.end <= end)
    }

    fn find_punct(&self, c: char) -> Option<usize> {
        self.tokens[self.pos..]
            .iter()
            .position(|t| t.is_punct(c))
            .map(|p| p + self.pos)
    }
}

/// `name(args)` with the raw argument text preserved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallExpr<'a> {
    /// Everything before the opening parenthesis, whitespace removed.
    pub name: String,
    /// Everything between the outer parentheses, untouched.
    pub args_text: &'a str,
    pub args: Vec<&'a str>,
}

pub fn parse_call(text: &str) -> Result<CallExpr<'_>> {
    let tokens = tokenize(text)?;
    let mut parser = Parser::new(text, "call", &tokens, false);

    let open = parser
        .find_punct('(')
        .ok_or_else(|| parser.error("no argument list"))?;
    let name: String = text[..tokens[open].start]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if name.is_empty() {
        return Err(parser.error("no function name"));
    }

    parser.pos = open;
    let group = parser.group()?;
    if let Some(extra) = tokens.get(parser.pos) {
        return Err(parser.error(format!(
            "unexpected `{}` after the argument list",
            extra.text(text)
        )));
    }

    Ok(CallExpr {
        name,
        args_text: &text[group.inner],
        args: group.items.into_iter().map(|r| &text[r]).collect(),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param<'a> {
    pub text: &'a str,
    pub span: Range<usize>,
    /// Declared name with pointer/reference sigils stripped. Macro-style
    /// parameters such as `BL_FORT_FAB_ARG_3D(a)` are named by their whole
    /// text.
    pub name: &'a str,
}

/// A function prototype: `<prefix> <return type> name(params) <suffix>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prototype<'a> {
    pub text: &'a str,
    pub name_span: Range<usize>,
    pub params_span: Range<usize>,
    pub params: Vec<Param<'a>>,
}

impl<'a> Prototype<'a> {
    pub fn name(&self) -> &'a str {
        &self.text[self.name_span.clone()]
    }

    /// Re-renders the prototype from byte `from`, substituting the name and
    /// every parameter. Whatever sits between parameters (commas, line
    /// breaks, indentation) is kept as written. `params` holds one replacement
    /// per parameter, in order.
    pub fn splice<S: AsRef<str>>(&self, from: usize, name: &str, params: &[S]) -> String {
        debug_assert_eq!(params.len(), self.params.len(), "one replacement per parameter");
        let mut out = String::with_capacity(self.text.len() + 32);
        out.push_str(&self.text[from..self.name_span.start]);
        out.push_str(name);
        let mut cursor = self.name_span.end;
        for (param, replacement) in self.params.iter().zip(params) {
            out.push_str(&self.text[cursor..param.span.start]);
            out.push_str(replacement.as_ref());
            cursor = param.span.end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

/// Parses the first `<return_type> <name>(...)` in `text`. The return type is
/// matched case-insensitively.
pub fn parse_prototype<'a>(text: &'a str, return_type: &str) -> Result<Prototype<'a>> {
    let tokens = tokenize(text)?;
    let mut parser = Parser::new(text, "declaration", &tokens, true);

    let name_idx = tokens
        .windows(3)
        .position(|w| {
            w[0].kind == TokenKind::Ident
                && w[0].text(text).eq_ignore_ascii_case(return_type)
                && w[1].kind == TokenKind::Ident
                && w[2].is_punct('(')
        })
        .map(|p| p + 1)
        .ok_or_else(|| parser.error(format!("no `{return_type} name(` found")))?;

    parser.pos = name_idx + 1;
    let group = parser.group()?;

    let params = if is_void_list(&text[group.inner.clone()]) {
        vec![]
    } else {
        group
            .items
            .iter()
            .map(|span| {
                let span_tokens: Vec<Token> = tokens
                    .iter()
                    .filter(|t| t.start >= span.start && t.end <= span.end)
                    .copied()
                    .collect();
                let name = param_name(text, &span_tokens)
                    .ok_or_else(|| parser.error(format!("unnamed parameter `{}`", &text[span.clone()])))?;
                Ok(Param {
                    text: &text[span.clone()],
                    span: span.clone(),
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    Ok(Prototype {
        text,
        name_span: tokens[name_idx].start..tokens[name_idx].end,
        params_span: group.inner,
        params,
    })
}

fn is_void_list(inner: &str) -> bool {
    let inner = inner.trim();
    inner.is_empty() || inner == "void"
}

fn param_name<'a>(src: &'a str, tokens: &[Token]) -> Option<&'a str> {
    let mut end = tokens.len();
    // Array declarators: `int lo[3]`.
    while end > 0 && tokens[end - 1].is_punct(']') {
        let open = matching_open(tokens, end - 1, '[', ']')?;
        end = open;
    }
    let last = tokens.get(end.checked_sub(1)?)?;
    if last.is_punct(')') {
        let open = matching_open(tokens, end - 1, '(', ')')?;
        let callee_idx = open.checked_sub(1)?;
        let callee = tokens.get(callee_idx)?;
        if callee.kind == TokenKind::Ident {
            return Some(&src[callee.start..last.end]);
        }
        // Function pointer: `Real (*cb)(int)` is named inside the declarator.
        if callee.is_punct(')') {
            let declarator = matching_open(tokens, callee_idx, '(', ')')?;
            return tokens[declarator..callee_idx]
                .iter()
                .rev()
                .find(|t| t.kind == TokenKind::Ident)
                .map(|t| t.text(src));
        }
        return None;
    }
    tokens[..end]
        .iter()
        .rev()
        .find(|t| t.kind == TokenKind::Ident)
        .map(|t| t.text(src))
}

fn matching_open(tokens: &[Token], close_idx: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for idx in (0..=close_idx).rev() {
        if tokens[idx].is_punct(close) {
            depth += 1;
        } else if tokens[idx].is_punct(open) {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}
