use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RewriteError>;

/// Every failure aborts the whole run; each variant names the file or target
/// that caused it.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("cannot read {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("macro expansion of {} failed: {source}", path.display())]
    Expand {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: statement is never terminated", path.display())]
    UnterminatedStatement { path: PathBuf, line: usize },

    #[error("{}cannot parse {what} `{text}`: {reason}", location(path.as_deref(), *line))]
    Syntax {
        /// File and 1-based line of the statement, once known.
        path: Option<PathBuf>,
        line: usize,
        what: &'static str,
        text: String,
        reason: String,
    },

    #[error(
        "function signature of `{function}` must have exactly one `{lower}` and one `{upper}` parameter:\n{signature}"
    )]
    ConventionViolation {
        function: String,
        signature: String,
        lower: String,
        upper: String,
    },

    #[error(
        "`{function}` disagrees between expanded and raw views of {}: {expanded} vs {raw}",
        path.display()
    )]
    ViewMismatch {
        function: String,
        path: PathBuf,
        expanded: String,
        raw: String,
    },

    #[error("`{function}`: tag `{tag}` at argument {position} but only {params} parameters declared")]
    TagOutOfRange {
        function: String,
        tag: String,
        position: usize,
        params: usize,
    },
}

impl RewriteError {
    pub(crate) fn syntax(what: &'static str, text: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            path: None,
            line: 0,
            what,
            text: text.trim().to_string(),
            reason: reason.into(),
        }
    }

    /// Attaches the statement's position to a syntax error; other errors
    /// already name their file.
    pub(crate) fn located(self, at: &Path, first_line: usize) -> Self {
        match self {
            Self::Syntax {
                path: None,
                what,
                text,
                reason,
                ..
            } => Self::Syntax {
                path: Some(at.to_path_buf()),
                line: first_line,
                what,
                text,
                reason,
            },
            other => other,
        }
    }
}

fn location(path: Option<&Path>, line: usize) -> String {
    match path {
        Some(path) => format!("{}:{line}: ", path.display()),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_convention_violation_names_function() {
        let error = RewriteError::ConventionViolation {
            function: String::from("ca_foo"),
            signature: String::from("void ca_foo(int* a)"),
            lower: String::from("lo"),
            upper: String::from("hi"),
        };
        let msg = error.to_string();
        assert!(msg.contains("ca_foo"));
        assert!(msg.contains("`lo`"));
        assert!(msg.contains("void ca_foo(int* a)"));
    }

    #[test]
    fn test_located_syntax_error_names_file() {
        let error = RewriteError::syntax("call", " foo(a, (b) ", "missing `)`");
        assert_eq!(error.to_string(), "cannot parse call `foo(a, (b)`: missing `)`");
        let error = error.located(Path::new("Castro_advance.cpp"), 3);
        assert_eq!(
            error.to_string(),
            "Castro_advance.cpp:3: cannot parse call `foo(a, (b)`: missing `)`"
        );
        // The first position attached wins.
        let error = error.located(Path::new("other.cpp"), 9);
        assert!(error.to_string().starts_with("Castro_advance.cpp:3:"));
    }

    #[test]
    fn test_resource_error_keeps_source() {
        use std::error::Error;
        let error = RewriteError::Resource {
            path: PathBuf::from("Castro_F.H"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(error.to_string().contains("Castro_F.H"));
        assert!(error.source().is_some());
    }
}
