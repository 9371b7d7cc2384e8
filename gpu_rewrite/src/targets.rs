use std::collections::{BTreeMap, BTreeSet};

use crate::{
    convention::Conventions,
    error::Result,
    source::SourceFile,
    statement::{Segment, Statements},
    syntax::parse_call,
};

/// Argument positions (zero-based) at which each tag token was seen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagPositions(BTreeMap<String, BTreeSet<usize>>);

impl TagPositions {
    pub fn from_args<S: AsRef<str>>(args: &[S], tags: &[String]) -> Self {
        Self(
            tags.iter()
                .map(|tag| {
                    let positions = args
                        .iter()
                        .enumerate()
                        .filter(|(_, arg)| arg.as_ref().contains(tag.as_str()))
                        .map(|(idx, _)| idx)
                        .collect();
                    (tag.clone(), positions)
                })
                .collect(),
        )
    }

    pub fn positions(&self, tag: &str) -> Option<&BTreeSet<usize>> {
        self.0.get(tag)
    }

    /// First tag recorded at `position`, if any.
    pub fn tag_at(&self, position: usize) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, positions)| positions.contains(&position))
            .map(|(tag, _)| tag.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0
            .iter()
            .flat_map(|(tag, positions)| positions.iter().map(move |&p| (tag.as_str(), p)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallTarget {
    /// Name as written at the call site.
    pub name: String,
    pub tags: TagPositions,
}

/// Every offloaded function, keyed by lowercase name. Built once by
/// [`collect`] and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, CallTarget>,
}

impl TargetRegistry {
    pub fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    pub fn get(&self, name: &str) -> Option<&CallTarget> {
        self.targets.get(&Self::key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(&Self::key(name))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallTarget> {
        self.targets.values()
    }

    fn insert(&mut self, target: CallTarget) {
        let key = Self::key(&target.name);
        if let Some(previous) = self.targets.get(&key) {
            if previous.tags != target.tags {
                tracing::warn!(
                    "`{}` is offloaded at several call sites with different tagged arguments; the last one wins",
                    target.name
                );
            }
        }
        self.targets.insert(key, target);
    }
}

impl FromIterator<CallTarget> for TargetRegistry {
    fn from_iter<I: IntoIterator<Item = CallTarget>>(iter: I) -> Self {
        let mut registry = Self::default();
        iter.into_iter().for_each(|t| registry.insert(t));
        registry
    }
}

/// The call targets of one source file, in order of appearance.
pub fn call_targets(source: &SourceFile, conventions: &Conventions) -> Result<Vec<CallTarget>> {
    let mut found = vec![];
    for segment in Statements::marked(source, conventions) {
        let Segment::Statement(stmt) = segment? else {
            continue;
        };
        let body = stmt.body(conventions);
        let call = parse_call(&body).map_err(|e| e.located(&source.path, stmt.first_line))?;
        tracing::debug!(
            "{}:{}: offloaded call to `{}`",
            source.path.display(),
            stmt.first_line,
            call.name
        );
        found.push(CallTarget {
            tags: TagPositions::from_args(&call.args, &conventions.tags),
            name: call.name,
        });
    }
    Ok(found)
}

/// Scans every source file for marked call sites. Files are visited in order
/// and a later call site for the same function replaces an earlier one.
pub fn collect(sources: &[SourceFile], conventions: &Conventions) -> Result<TargetRegistry> {
    let mut all = vec![];
    for source in sources {
        all.extend(call_targets(source, conventions)?);
    }
    Ok(all.into_iter().collect())
}
