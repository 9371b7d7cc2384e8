//! Renders the generated copy of a header: its pass-through lines followed by
//! a guarded block holding one device/kernel pair per offloaded declaration.

use std::fmt::Write as _;

use crate::{
    convention::Conventions,
    error::Result,
    rewrite::{rewrite, GeneratedPair},
    signature::HeaderScan,
    source::SourceFile,
};

const INCLUDES: [&str; 3] = ["AMReX_ArrayLim.H", "AMReX_BLFort.H", "AMReX_Device.H"];
const DEVICE_GUARD: &str = "AMREX_USE_CUDA";

/// `_cuda_<stem>_`, e.g. `_cuda_Castro_F_` for `Castro_F.H`.
pub fn include_guard(header: &SourceFile) -> String {
    let stem = header
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| header.file_name());
    format!("_cuda_{stem}_")
}

fn write_pair(out: &mut String, pair: &GeneratedPair) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}\n", pair.device);
    let _ = writeln!(out);
    out.push_str(&pair.kernel);
    let _ = writeln!(out);
}

pub fn emit_header(scan: &HeaderScan<'_>, conventions: &Conventions) -> Result<String> {
    let pairs = scan
        .declarations
        .iter()
        .map(|decl| rewrite(decl, conventions))
        .collect::<Result<Vec<_>>>()?;

    let mut out: String = scan.passthrough.concat();
    let guard = include_guard(scan.header);

    let _ = writeln!(out);
    for include in INCLUDES {
        let _ = writeln!(out, "#include <{include}>");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}\n");
    let _ = writeln!(out, "#ifdef {DEVICE_GUARD}");
    let _ = writeln!(out, "extern \"C\" {{\n");

    for (decl, pair) in scan.declarations.iter().zip(&pairs) {
        tracing::debug!(
            "{}: generated `{}` and `{}`",
            scan.header.path.display(),
            conventions.device_name(&decl.name),
            conventions.kernel_name(&decl.name)
        );
        write_pair(&mut out, pair);
    }

    let _ = writeln!(out, "\n}}");
    let _ = writeln!(out, "#endif");
    let _ = writeln!(out);
    let _ = writeln!(out, "#endif");
    Ok(out)
}
