//! Integration tests for the pragma_gpu CLI.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HEADER: &str = "\
#ifndef CASTRO_F_H
#define CASTRO_F_H
#ifdef __cplusplus
extern \"C\" {
#endif
  void ca_ctoprim(const int* lo, const int* hi,
                  BL_FORT_FAB_ARG_3D(uin),
                  const amrex::Real* dx); // conserved to primitive
  void ca_host_only(const int* n);
#ifdef __cplusplus
}
#endif
#endif
";

const CXX: &str = "\
#include <Castro_F.H>

void Castro::advance(Real dt)
{
    const Box& bx = mfi.tilebox();
#pragma gpu
    ca_ctoprim(AMREX_INT_ANYD(bx.loVect()), AMREX_INT_ANYD(bx.hiVect()),
               BL_TO_FORTRAN_ANYD(Sborder[mfi]),
               AMREX_REAL_ANYD(dx));
}
";

const FORTRAN: &str = "\
module castro_util
contains
  AMREX_DEVICE subroutine ca_ctoprim(lo, hi, uin, uin_lo, uin_hi, dx) bind(C, name=\"ca_ctoprim\")
  end subroutine ca_ctoprim
end module castro_util
";

fn write_inputs(dir: &Path) {
    fs::write(dir.join("Castro_F.H"), HEADER).expect("Failed to write header");
    fs::write(dir.join("Castro_advance.cpp"), CXX).expect("Failed to write source");
    fs::write(dir.join("Castro_util.F90"), FORTRAN).expect("Failed to write fortran");
}

fn run_cli(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("pragma_gpu").expect("Failed to find pragma_gpu binary");
    cmd.args(args);
    cmd
}

#[test]
fn test_help_lists_options() {
    run_cli(&["--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--vpath"))
        .stdout(predicates::str::contains("--headers"))
        .stdout(predicates::str::contains("--exclude-defines"))
        .stdout(predicates::str::contains("--tag"));
}

#[test]
fn test_generates_header_and_source() {
    let src = TempDir::new().expect("Failed to create temp dir");
    let out = TempDir::new().expect("Failed to create temp dir");
    write_inputs(src.path());

    run_cli(&[
        "--vpath",
        src.path().to_str().unwrap(),
        "--fortran",
        "Castro_util.F90",
        "--headers",
        "Castro_F.H",
        "--cxx",
        "Castro_advance.cpp",
        "--output-dir",
        out.path().to_str().unwrap(),
    ])
    .assert()
    .success();

    let header = fs::read_to_string(out.path().join("Castro_F.H")).unwrap();
    assert!(header.starts_with("#ifndef CASTRO_F_H\n#define CASTRO_F_H\n"));
    assert!(header.contains("  void ca_host_only(const int* n);\n"));
    assert!(header.contains("#ifndef _cuda_Castro_F_\n"));
    assert!(header.contains(
        "__device__ void ca_ctoprim_device(const int* lo, const int* hi,\n                  BL_FORT_FAB_ARG_3D(uin),\n                  const amrex::Real* dx);"
    ));
    assert!(header.contains("__global__ static void cuda_ca_ctoprim(const int lo_1, const int lo_2, const int lo_3, const int hi_1, const int hi_2, const int hi_3,"));
    assert!(header.contains("ca_ctoprim_device(blo, bhi, BL_FORT_FAB_VAL_3D(uin), dx);"));
    assert!(!header.contains("conserved to primitive"));

    let cxx = fs::read_to_string(out.path().join("Castro_advance.cpp")).unwrap();
    assert!(!cxx.contains("#pragma gpu"));
    assert!(cxx.contains("dim3 ca_ctoprimnumBlocks, ca_ctoprimnumThreads;\n"));
    assert!(cxx.contains("cuda_ca_ctoprim<<<ca_ctoprimnumBlocks, ca_ctoprimnumThreads, 0, Device::cudaStream()>>>\n    (AMREX_INT_ANYD(bx.loVect())"));
    assert!(cxx.ends_with("AMREX_REAL_ANYD(dx));\n}\n"));

    // Inputs are left alone.
    assert_eq!(fs::read_to_string(src.path().join("Castro_F.H")).unwrap(), HEADER);
}

#[test]
fn test_warns_about_routines_not_marked_for_device() {
    let src = TempDir::new().expect("Failed to create temp dir");
    let out = TempDir::new().expect("Failed to create temp dir");
    write_inputs(src.path());
    fs::write(
        src.path().join("Castro_util.F90"),
        "module castro_util\ncontains\n  subroutine ca_ctoprim(lo, hi) bind(C)\n  end subroutine ca_ctoprim\nend module castro_util\n",
    )
    .unwrap();

    run_cli(&[
        "--vpath",
        src.path().to_str().unwrap(),
        "--fortran",
        "Castro_util.F90",
        "--headers",
        "Castro_F.H",
        "--cxx",
        "Castro_advance.cpp",
        "--output-dir",
        out.path().to_str().unwrap(),
    ])
    .env("RUST_LOG", "warn")
    .assert()
    .success()
    .stderr(predicates::str::contains(
        "`ca_ctoprim` is offloaded but no Fortran subroutine of that name is marked for the device",
    ));

    assert!(out.path().join("Castro_F.H").exists());
}

#[test]
fn test_marked_routines_do_not_warn() {
    let src = TempDir::new().expect("Failed to create temp dir");
    let out = TempDir::new().expect("Failed to create temp dir");
    write_inputs(src.path());

    run_cli(&[
        "--vpath",
        src.path().to_str().unwrap(),
        "--fortran",
        "Castro_util.F90",
        "--cxx",
        "Castro_advance.cpp",
        "--output-dir",
        out.path().to_str().unwrap(),
    ])
    .env("RUST_LOG", "warn")
    .assert()
    .success()
    .stderr(predicates::str::contains("no Fortran subroutine").not());
}

#[test]
fn test_missing_file_fails() {
    let src = TempDir::new().expect("Failed to create temp dir");
    run_cli(&[
        "--vpath",
        src.path().to_str().unwrap(),
        "--headers",
        "Nowhere_F.H",
    ])
    .assert()
    .failure()
    .code(1)
    .stderr(predicates::str::contains("Error: cannot find Nowhere_F.H"));
}

#[test]
fn test_convention_violation_writes_nothing() {
    let src = TempDir::new().expect("Failed to create temp dir");
    let out = TempDir::new().expect("Failed to create temp dir");
    write_inputs(src.path());
    fs::write(
        src.path().join("Castro_F.H"),
        "void ca_ctoprim(const int* lo, BL_FORT_FAB_ARG_3D(uin), const amrex::Real* dx);\n",
    )
    .unwrap();

    run_cli(&[
        "--vpath",
        src.path().to_str().unwrap(),
        "--headers",
        "Castro_F.H",
        "--cxx",
        "Castro_advance.cpp",
        "--output-dir",
        out.path().to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicates::str::contains("ca_ctoprim"))
    .stderr(predicates::str::contains("`lo` and one `hi`"));

    assert!(!out.path().join("Castro_F.H").exists());
    assert!(!out.path().join("Castro_advance.cpp").exists());
}

#[cfg(unix)]
#[test]
fn test_preprocessor_copy_is_kept() {
    let src = TempDir::new().expect("Failed to create temp dir");
    let out = TempDir::new().expect("Failed to create temp dir");
    write_inputs(src.path());

    run_cli(&[
        "--vpath",
        src.path().to_str().unwrap(),
        "--headers",
        "Castro_F.H",
        "--cxx",
        "Castro_advance.cpp",
        "--output-dir",
        out.path().to_str().unwrap(),
        "--cpp",
        "cat",
    ])
    .assert()
    .success();

    assert_eq!(fs::read_to_string(out.path().join("CPP-Castro_F.H")).unwrap(), HEADER);
    let header = fs::read_to_string(out.path().join("Castro_F.H")).unwrap();
    assert_eq!(header.matches("__global__ static void cuda_ca_ctoprim(").count(), 1);
}
