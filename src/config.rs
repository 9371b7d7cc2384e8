use std::path::PathBuf;

use gpu_rewrite::Conventions;

/// Everything a run needs, already split into lists.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    /// Search path for every input file, in priority order.
    pub vpath: Vec<PathBuf>,
    /// Fortran sources scanned for device-marked subroutines.
    pub fortran: Vec<String>,
    pub headers: Vec<String>,
    pub cxx: Vec<String>,
    pub output_dir: PathBuf,
    /// Preprocessor command line; headers are scanned unexpanded without one.
    pub cpp: Option<Vec<String>>,
    pub defines: Vec<String>,
    pub tags: Vec<String>,
}

impl RunConfig {
    pub fn conventions(&self) -> Conventions {
        let conventions = Conventions::default();
        if self.tags.is_empty() {
            conventions
        } else {
            conventions.with_tags(self.tags.iter().cloned())
        }
    }
}

/// Splits a whitespace-separated list as passed by make.
pub fn split_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

/// Drops every define that is one of `excludes`, either bare or with a value:
/// excluding `-DAMREX_USE_CUDA` removes `-DAMREX_USE_CUDA` and
/// `-DAMREX_USE_CUDA=1` but keeps `-DAMREX_USE_CUDA_FORTRAN`.
pub fn filter_defines(defines: &str, excludes: &str) -> Vec<String> {
    let excludes = split_list(excludes);
    split_list(defines)
        .into_iter()
        .filter(|define| {
            let key = define.split_once('=').map_or(define.as_str(), |(k, _)| k);
            !excludes.iter().any(|ex| ex == define || ex == key)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_filter_defines() {
        let kept = filter_defines(
            "-DAMREX_USE_CUDA -DAMREX_USE_CUDA=1 -DAMREX_USE_CUDA_FORTRAN -DBL_SPACEDIM=3",
            "-DAMREX_USE_CUDA",
        );
        assert_eq!(kept, vec!["-DAMREX_USE_CUDA_FORTRAN", "-DBL_SPACEDIM=3"]);
    }

    #[test]
    fn test_filter_defines_without_excludes() {
        assert_eq!(filter_defines(" -DA  -DB ", ""), vec!["-DA", "-DB"]);
        assert!(filter_defines("", "-DA").is_empty());
    }

    #[test]
    fn test_tags_override_default() {
        let config = RunConfig::default();
        assert_eq!(config.conventions().tags, vec!["AMREX_INT_ANYD"]);
        let config = RunConfig {
            tags: vec![String::from("AMREX_REAL_ANYD")],
            ..Default::default()
        };
        assert_eq!(config.conventions().tags, vec!["AMREX_REAL_ANYD"]);
    }
}
