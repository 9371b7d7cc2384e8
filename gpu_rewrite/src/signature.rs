//! Finds the declarations of offloaded functions in a header.
//!
//! Detection runs over the macro-expanded header, because declarations may
//! only become visible once conditional macros are resolved. Emission keeps
//! the raw header, so its own preprocessor directives survive: the raw text is
//! scanned a second time, for the names found in the expanded view, to learn
//! which lines the generated declarations replace.

use std::{collections::BTreeMap, io};

use crate::{
    convention::Conventions,
    error::{Result, RewriteError},
    source::SourceFile,
    statement::{Opening, Segment, Statement, Statements},
    syntax::{parse_prototype, tokenize, TokenKind},
    targets::{TagPositions, TargetRegistry},
};

/// Produces the macro-expanded text of a header.
pub trait MacroExpander {
    fn expand(&self, header: &SourceFile) -> io::Result<String>;
}

impl<F> MacroExpander for F
where
    F: Fn(&SourceFile) -> io::Result<String>,
{
    fn expand(&self, header: &SourceFile) -> io::Result<String> {
        self(header)
    }
}

/// 1-based, inclusive line range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSpan {
    pub first_line: usize,
    pub last_line: usize,
}

/// One offloaded function's declaration, as seen in both views of a header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Name as declared, capitalization preserved.
    pub name: String,
    /// Declaration text from the expanded view, without its terminator.
    pub text: String,
    pub param_count: usize,
    pub expanded: SourceSpan,
    pub raw: SourceSpan,
    /// Tag positions inherited from the call site.
    pub tags: TagPositions,
}

#[derive(Debug)]
pub struct HeaderScan<'a> {
    pub header: &'a SourceFile,
    /// Raw header lines outside any captured declaration, in order.
    pub passthrough: Vec<&'a str>,
    /// One entry per offloaded function declared in the raw header, in order
    /// of appearance.
    pub declarations: Vec<Declaration>,
}

/// If `line` starts a `<return type> <name>(` declaration whose name passes
/// `wanted`, returns the lowercase name.
fn declared_name(line: &str, conventions: &Conventions, wanted: impl Fn(&str) -> bool) -> Option<String> {
    let code = conventions.strip_comment(line);
    // A line that does not even tokenize cannot start a declaration.
    let tokens = tokenize(code).ok()?;
    tokens.iter().enumerate().find_map(|(idx, tok)| {
        let name = tokens.get(idx + 1)?;
        let is_decl = tok.kind == TokenKind::Ident
            && tok.text(code).eq_ignore_ascii_case(&conventions.return_type)
            && name.kind == TokenKind::Ident
            && tokens
                .get(idx + 2)
                .is_none_or(|next| next.kind == TokenKind::Punct('('));
        let key = TargetRegistry::key(name.text(code));
        (is_decl && wanted(&key)).then_some(key)
    })
}

struct Captured {
    name: String,
    text: String,
    param_count: usize,
    span: SourceSpan,
}

impl Captured {
    /// Same function with the same arity; the two views of one declaration
    /// must at least agree on this.
    fn agrees_with(&self, other: &Captured) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.param_count == other.param_count
    }

    fn describe(&self) -> String {
        format!(
            "{} with {} parameters at line {}",
            self.name, self.param_count, self.span.first_line
        )
    }
}

fn capture<K>(header: &SourceFile, stmt: &Statement<'_, K>, conventions: &Conventions) -> Result<Captured> {
    let body = stmt.body(conventions);
    let text = body.trim();
    let proto = parse_prototype(text, &conventions.return_type)
        .map_err(|e| e.located(&header.path, stmt.first_line))?;
    Ok(Captured {
        name: proto.name().to_string(),
        param_count: proto.params.len(),
        text: text.to_string(),
        span: SourceSpan {
            first_line: stmt.first_line,
            last_line: stmt.last_line(),
        },
    })
}

/// Declarations of registry targets in `text`, first match per name.
fn find_declarations(
    header: &SourceFile,
    text: &str,
    registry: &TargetRegistry,
    conventions: &Conventions,
) -> Result<BTreeMap<String, Captured>> {
    let mut found: BTreeMap<String, Captured> = BTreeMap::new();
    let statements = Statements::new(
        header.path.as_path(),
        text,
        |line: &str| match declared_name(line, conventions, |key| registry.contains(key)) {
            Some(key) => Opening::Here(key),
            None => Opening::No,
        },
        |line: &str| conventions.is_terminated(line),
    );
    for segment in statements {
        let Segment::Statement(stmt) = segment? else {
            continue;
        };
        let captured = capture(header, &stmt, conventions)?;
        match found.get(&stmt.key) {
            Some(first) if first.text != captured.text => {
                tracing::warn!(
                    "{}: `{}` declared again at line {} with a different signature; keeping the declaration at line {}",
                    header.path.display(),
                    captured.name,
                    captured.span.first_line,
                    first.span.first_line
                );
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    "found target `{}` in expanded {}",
                    captured.name,
                    header.path.display()
                );
                found.insert(stmt.key, captured);
            }
        }
    }
    Ok(found)
}

pub fn scan_header<'a>(
    header: &'a SourceFile,
    registry: &TargetRegistry,
    expander: Option<&dyn MacroExpander>,
    conventions: &Conventions,
) -> Result<HeaderScan<'a>> {
    let expanded_text = match expander {
        Some(expander) => expander.expand(header).map_err(|source| RewriteError::Expand {
            path: header.path.clone(),
            source,
        })?,
        None => header.text.clone(),
    };

    let expanded = find_declarations(header, &expanded_text, registry, conventions)?;

    let mut passthrough = vec![];
    // Every raw occurrence leaves the pass-through, whichever branch of a
    // conditional it sits in.
    let mut occurrences: Vec<(String, Captured)> = vec![];
    let raw = Statements::new(
        header.path.as_path(),
        header.text.as_str(),
        |line: &str| match declared_name(line, conventions, |key| expanded.contains_key(key)) {
            Some(key) => Opening::Here(key),
            None => Opening::No,
        },
        |line: &str| conventions.is_terminated(line),
    );
    for segment in raw {
        match segment? {
            Segment::Line(line) => passthrough.push(line),
            Segment::Statement(stmt) => {
                let captured = capture(header, &stmt, conventions)?;
                occurrences.push((stmt.key, captured));
            }
        }
    }

    let mut declarations: Vec<Declaration> = vec![];
    for (idx, (key, _)) in occurrences.iter().enumerate() {
        let Some(seen) = expanded.get(key) else {
            continue;
        };
        if occurrences[..idx].iter().any(|(k, _)| k == key) {
            continue;
        }
        let candidates: Vec<&Captured> = occurrences
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, c)| c)
            .collect();
        let Some(raw_view) = candidates.iter().find(|c| c.agrees_with(seen)) else {
            return Err(RewriteError::ViewMismatch {
                function: seen.name.clone(),
                path: header.path.clone(),
                expanded: seen.describe(),
                raw: candidates
                    .iter()
                    .map(|c| c.describe())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };
        tracing::debug!(
            "found target `{}` in raw {} at line {} ({} occurrence(s))",
            seen.name,
            header.path.display(),
            raw_view.span.first_line,
            candidates.len()
        );
        let tags = registry
            .get(key)
            .map(|target| target.tags.clone())
            .unwrap_or_default();
        declarations.push(Declaration {
            name: seen.name.clone(),
            text: seen.text.clone(),
            param_count: seen.param_count,
            expanded: seen.span,
            raw: raw_view.span,
            tags,
        });
    }

    Ok(HeaderScan {
        header,
        passthrough,
        declarations,
    })
}
