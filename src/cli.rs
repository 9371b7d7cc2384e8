use std::path::PathBuf;

use clap::Parser;
use pragma_gpu::{
    config::{filter_defines, split_list},
    RunConfig,
};

/// List-valued options take one whitespace-separated string, the way the
/// makefiles pass them.
#[derive(Parser, Debug)]
#[command(name = "pragma_gpu")]
#[command(version, about = "Generate CUDA launch wrappers for #pragma gpu call sites", long_about = None)]
pub struct Cli {
    /// Directories searched, in order, for every input file
    #[arg(long, default_value = ".")]
    pub vpath: String,

    /// Fortran files checked for device-marked subroutines
    #[arg(long, default_value = "")]
    pub fortran: String,

    /// Headers whose offloaded declarations get device/kernel pairs
    #[arg(long, default_value = "")]
    pub headers: String,

    /// C++ files whose `#pragma gpu` calls become kernel launches
    #[arg(long, default_value = "")]
    pub cxx: String,

    /// Where the generated files are written
    #[arg(long, visible_alias = "output_dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Preprocessor command used to expand headers; without it headers are
    /// scanned as written
    #[arg(long, default_value = "")]
    pub cpp: String,

    /// Defines passed to the preprocessor
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub defines: String,

    /// Defines removed from --defines
    #[arg(long, visible_alias = "exclude_defines", default_value = "", allow_hyphen_values = true)]
    pub exclude_defines: String,

    /// Argument macro whose positions are passed by value (repeatable)
    #[arg(long = "tag", value_name = "MACRO", default_value = "AMREX_INT_ANYD")]
    pub tags: Vec<String>,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        let cpp = split_list(&cli.cpp);
        Self {
            vpath: split_list(&cli.vpath).into_iter().map(PathBuf::from).collect(),
            fortran: split_list(&cli.fortran),
            headers: split_list(&cli.headers),
            cxx: split_list(&cli.cxx),
            output_dir: cli.output_dir,
            cpp: (!cpp.is_empty()).then_some(cpp),
            defines: filter_defines(&cli.defines, &cli.exclude_defines),
            tags: cli.tags,
        }
    }
}
