//! Build-time rewriting of `#pragma gpu` call sites into CUDA kernel launches.
//!
//! The C++ sources name the offloaded Fortran routines; their `*_F.H`
//! headers are copied to the output directory with a `__device__`
//! declaration and a `__global__` grid-stride wrapper added for each target,
//! and the sources are copied with every marked call replaced by a launch of
//! that wrapper.

use std::{fs, path::PathBuf};

use gpu_rewrite::{
    device_routines::collect_device_routines, emit_header, expand_call_sites, scan_header,
    MacroExpander, SourceFile, TargetRegistry,
};

/// Plain run settings, decoupled from the command line.
pub mod config;
pub mod error;
/// External C preprocessor used to expand headers.
pub mod preprocess;
/// File lookup along a search path.
pub mod vpath;

pub use config::RunConfig;
pub use error::{Error, Result};
use preprocess::Preprocessor;

fn read_all(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    paths
        .iter()
        .map(|p| SourceFile::read(p).map_err(Error::from))
        .collect()
}

/// Warns about targets without an `AMREX_DEVICE` (or `attributes(device)`)
/// subroutine in any of the Fortran files.
fn check_device_routines(registry: &TargetRegistry, fortran: &[SourceFile]) {
    if fortran.is_empty() {
        return;
    }
    let routines = collect_device_routines(fortran);
    tracing::debug!("{} device subroutine(s) in Fortran sources", routines.len());
    for target in registry.iter() {
        if !routines.contains(&TargetRegistry::key(&target.name)) {
            tracing::warn!(
                "`{}` is offloaded but no Fortran subroutine of that name is marked for the device",
                target.name
            );
        }
    }
}

/// Runs the whole rewrite and returns the paths written. Generated files are
/// only written once every header and source has been processed; the
/// preprocessor's `CPP-*` copies are the exception.
pub fn run(config: &RunConfig) -> Result<Vec<PathBuf>> {
    let conventions = config.conventions();

    let header_paths = vpath::find_files(&config.vpath, &config.headers)?;
    let cxx = read_all(&vpath::find_files(&config.vpath, &config.cxx)?)?;
    let fortran = read_all(&vpath::find_files(&config.vpath, &config.fortran)?)?;

    tracing::info!("looking in {} C++ file(s) for offloaded calls", cxx.len());
    let registry = gpu_rewrite::collect(&cxx, &conventions)?;
    tracing::info!("found {} offloaded target(s)", registry.len());
    check_device_routines(&registry, &fortran);

    fs::create_dir_all(&config.output_dir).map_err(|source| Error::Io {
        path: config.output_dir.clone(),
        source,
    })?;
    let preprocessor = config
        .cpp
        .clone()
        .map(|command| Preprocessor::new(command, config.defines.clone(), &config.output_dir));

    let mut outputs: Vec<(PathBuf, String)> = vec![];
    for path in &header_paths {
        let header = SourceFile::read(path)?;
        let expander = preprocessor.as_ref().map(|p| p as &dyn MacroExpander);
        let scan = scan_header(&header, &registry, expander, &conventions)?;
        tracing::info!(
            "{}: {} offloaded declaration(s)",
            header.path.display(),
            scan.declarations.len()
        );
        let text = emit_header(&scan, &conventions)?;
        outputs.push((config.output_dir.join(header.file_name()), text));
    }
    for source in &cxx {
        let text = expand_call_sites(source, &conventions)?;
        outputs.push((config.output_dir.join(source.file_name()), text));
    }

    outputs
        .into_iter()
        .map(|(path, text)| {
            fs::write(&path, text).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            Ok(path)
        })
        .collect()
}
