use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use gpu_rewrite::{MacroExpander, SourceFile};

use crate::error::{Error, Result};

/// Runs an external C preprocessor over a header, keeping the expanded copy
/// next to the generated files as `CPP-<header name>`.
#[derive(Clone, Debug)]
pub struct Preprocessor {
    command: Vec<String>,
    defines: Vec<String>,
    output_dir: PathBuf,
}

impl Preprocessor {
    pub fn new(command: Vec<String>, defines: Vec<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            defines,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path(&self, header: &SourceFile) -> PathBuf {
        self.output_dir.join(format!("CPP-{}", header.file_name()))
    }

    fn command_line(&self, header: &Path) -> String {
        let mut words = self.command.clone();
        words.extend(self.defines.iter().cloned());
        words.push(header.display().to_string());
        words.join(" ")
    }

    pub fn run(&self, header: &SourceFile) -> Result<String> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(Error::Preprocess {
                command: String::new(),
                header: header.path.clone(),
                stderr: String::from("empty preprocessor command"),
            });
        };
        tracing::debug!("{}", self.command_line(&header.path));

        let out = Command::new(program)
            .args(args)
            .args(&self.defines)
            .arg(&header.path)
            .output()
            .map_err(|e| Error::Preprocess {
                command: self.command_line(&header.path),
                header: header.path.clone(),
                stderr: e.to_string(),
            })?;
        if !out.status.success() {
            return Err(Error::Preprocess {
                command: self.command_line(&header.path),
                header: header.path.clone(),
                stderr: String::from_utf8_lossy(&out.stderr).trim_end().to_string(),
            });
        }

        let path = self.output_path(header);
        fs::write(&path, &out.stdout).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl MacroExpander for Preprocessor {
    fn expand(&self, header: &SourceFile) -> io::Result<String> {
        self.run(header).map_err(io::Error::other)
    }
}

#[cfg(all(test, unix))]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn header(dir: &TempDir) -> SourceFile {
        let path = dir.path().join("Castro_F.H");
        fs::write(&path, "void ca_foo(const int* lo, const int* hi);\n").unwrap();
        SourceFile::read(&path).unwrap()
    }

    #[test]
    fn test_keeps_expanded_copy() {
        let dir = TempDir::new().unwrap();
        let header = header(&dir);
        let cpp = Preprocessor::new(vec![String::from("cat")], vec![], dir.path());
        let text = cpp.run(&header).unwrap();
        assert_eq!(text, header.text);
        assert_eq!(cpp.output_path(&header), dir.path().join("CPP-Castro_F.H"));
        assert_eq!(fs::read_to_string(cpp.output_path(&header)).unwrap(), header.text);
    }

    #[test]
    fn test_failure_reports_command() {
        let dir = TempDir::new().unwrap();
        let header = header(&dir);
        let cpp = Preprocessor::new(
            vec![String::from("sh"), String::from("-c"), String::from("echo bad define >&2; exit 1")],
            vec![String::from("-DFOO")],
            dir.path(),
        );
        match cpp.run(&header).unwrap_err() {
            Error::Preprocess { command, stderr, .. } => {
                assert!(command.starts_with("sh -c"));
                assert!(command.contains("-DFOO"));
                assert_eq!(stderr, "bad define");
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(!cpp.output_path(&header).exists());
    }

    #[test]
    fn test_expander_wraps_errors() {
        let dir = TempDir::new().unwrap();
        let header = header(&dir);
        let cpp = Preprocessor::new(vec![String::from("definitely-not-a-preprocessor")], vec![], dir.path());
        let err = cpp.expand(&header).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-preprocessor"));
    }
}
