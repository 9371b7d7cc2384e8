//! Splits a file into pass-through lines and complete statements.
//!
//! Call sites, expanded headers and raw headers are all read the same way: a
//! line *opens* a statement (either on that very line, or on the line after a
//! marker) and the statement runs until a line satisfies the terminator
//! predicate. Everything else is handed back untouched, line endings included.

use std::{iter::Enumerate, path::Path, str::SplitInclusive};

use crate::{
    convention::Conventions,
    error::{Result, RewriteError},
    source::SourceFile,
};

/// What a line means for the statement scanner. `K` is whatever the opener
/// wants to remember about the match (a target name, or nothing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opening<K> {
    No,
    /// The statement starts on this line.
    Here(K),
    /// This line is a marker; the statement starts on the next line.
    After(K),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement<'a, K> {
    pub key: K,
    pub marker: Option<&'a str>,
    /// 1-based number of the first statement line.
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

impl<K> Statement<'_, K> {
    pub fn last_line(&self) -> usize {
        self.first_line + self.lines.len() - 1
    }

    pub fn text(&self) -> String {
        self.lines.concat()
    }

    /// The statement without its terminator (and without anything after it on
    /// the final line).
    pub fn body(&self, conventions: &Conventions) -> String {
        let mut body = String::new();
        let (last, init) = match self.lines.split_last() {
            Some(split) => split,
            None => return body,
        };
        init.iter().for_each(|line| body.push_str(line));
        let last = conventions.strip_comment(last).trim_end();
        body.push_str(last.strip_suffix(conventions.terminator).unwrap_or(last));
        body
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a, K> {
    Line(&'a str),
    Statement(Statement<'a, K>),
}

pub struct Statements<'a, O, T> {
    path: &'a Path,
    lines: Enumerate<SplitInclusive<'a, char>>,
    opens: O,
    terminates: T,
}

impl<'a, K, O, T> Statements<'a, O, T>
where
    O: FnMut(&str) -> Opening<K>,
    T: Fn(&str) -> bool,
{
    pub fn new(path: &'a Path, text: &'a str, opens: O, terminates: T) -> Self {
        Self {
            path,
            lines: text.split_inclusive('\n').enumerate(),
            opens,
            terminates,
        }
    }

    fn accumulate(
        &mut self,
        key: K,
        marker: Option<&'a str>,
        first_idx: usize,
        first: &'a str,
    ) -> Result<Statement<'a, K>> {
        let mut lines = vec![first];
        let mut current = first;
        while !(self.terminates)(current) {
            match self.lines.next() {
                Some((_, line)) => {
                    lines.push(line);
                    current = line;
                }
                None => return Err(self.unterminated(first_idx)),
            }
        }
        Ok(Statement {
            key,
            marker,
            first_line: first_idx + 1,
            lines,
        })
    }

    fn unterminated(&self, idx: usize) -> RewriteError {
        RewriteError::UnterminatedStatement {
            path: self.path.to_path_buf(),
            line: idx + 1,
        }
    }
}

impl<'a> Statements<'a, (), ()> {
    /// Scanner over a source file using the marker and terminator of
    /// `conventions`. Marker lines open a statement on the following line.
    pub fn marked(
        source: &'a SourceFile,
        conventions: &'a Conventions,
    ) -> Statements<'a, impl FnMut(&str) -> Opening<()> + 'a, impl Fn(&str) -> bool + 'a> {
        Statements::new(
            source.path.as_path(),
            source.text.as_str(),
            move |line: &str| {
                if conventions.is_marker(line) {
                    Opening::After(())
                } else {
                    Opening::No
                }
            },
            move |line: &str| conventions.is_terminated(line),
        )
    }
}

impl<'a, K, O, T> Iterator for Statements<'a, O, T>
where
    O: FnMut(&str) -> Opening<K>,
    T: Fn(&str) -> bool,
{
    type Item = Result<Segment<'a, K>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, line) = self.lines.next()?;
        let res = match (self.opens)(line) {
            Opening::No => Ok(Segment::Line(line)),
            Opening::Here(key) => self.accumulate(key, None, idx, line).map(Segment::Statement),
            Opening::After(key) => match self.lines.next() {
                Some((next_idx, next)) => self
                    .accumulate(key, Some(line), next_idx, next)
                    .map(Segment::Statement),
                None => Err(self.unterminated(idx)),
            },
        };
        Some(res)
    }
}
