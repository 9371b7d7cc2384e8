use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves each of `names` against the search path `dirs`; the first
/// directory holding a file of that name wins.
pub fn find_files<D, N>(dirs: &[D], names: &[N]) -> Result<Vec<PathBuf>>
where
    D: AsRef<Path>,
    N: AsRef<str>,
{
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            dirs.iter()
                .map(|dir| dir.as_ref().join(name))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| Error::NotFound {
                    name: name.to_string(),
                    searched: dirs
                        .iter()
                        .map(|d| d.as_ref().display().to_string())
                        .collect(),
                })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_first_directory_wins() {
        let root = TempDir::new().unwrap();
        let (a, b) = (root.path().join("a"), root.path().join("b"));
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(b.join("Castro_F.H"), "b").unwrap();
        fs::write(a.join("Castro_F.H"), "a").unwrap();
        fs::write(b.join("Castro.cpp"), "").unwrap();

        let found = find_files(&[&a, &b], &["Castro_F.H", "Castro.cpp"]).unwrap();
        assert_eq!(found, vec![a.join("Castro_F.H"), b.join("Castro.cpp")]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let root = TempDir::new().unwrap();
        let err = find_files(&[root.path()], &["Nowhere_F.H"]).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name, .. } if name == "Nowhere_F.H"));
    }

    #[test]
    fn test_directories_are_not_files() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("Castro_F.H")).unwrap();
        assert!(find_files(&[root.path()], &["Castro_F.H"]).is_err());
    }
}
