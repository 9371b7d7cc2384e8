use std::path::PathBuf;

use gpu_rewrite::RewriteError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("cannot find {name} in any of: {}", searched.join(" "))]
    NotFound { name: String, searched: Vec<String> },

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed on {}: {stderr}", header.display())]
    Preprocess {
        command: String,
        header: PathBuf,
        stderr: String,
    },
}
