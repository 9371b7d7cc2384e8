//! Replaces each marked call with a kernel launch on the device stream.

use std::fmt::{self, Write as _};

use crate::{
    convention::Conventions,
    error::Result,
    source::SourceFile,
    statement::{Segment, Statements},
    syntax::parse_call,
};

/// A `<<<blocks, threads>>>` launch of the wrapper kernel for one call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Launch<'a> {
    /// Name as written at the call site; prefixes the launch-config variables.
    pub name: &'a str,
    pub kernel: String,
    /// Argument text of the original call, passed through untouched.
    pub args: &'a str,
}

impl fmt::Display for Launch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks = format!("{}numBlocks", self.name);
        let threads = format!("{}numThreads", self.name);
        writeln!(f, "dim3 {blocks}, {threads};")?;
        writeln!(f, "Device::grid_stride_threads_and_blocks({blocks}, {threads});")?;
        // The carveout attribute only exists from CUDA 9.1 on.
        writeln!(
            f,
            "#if ((__CUDACC_VER_MAJOR__ > 9) || (__CUDACC_VER_MAJOR__ == 9 && __CUDACC_VER_MINOR__ >= 1))"
        )?;
        writeln!(
            f,
            "CudaAPICheck(cudaFuncSetAttribute(&{}, cudaFuncAttributePreferredSharedMemoryCarveout, 0));",
            self.kernel
        )?;
        writeln!(f, "#endif")?;
        writeln!(
            f,
            "{}<<<{blocks}, {threads}, 0, Device::cudaStream()>>>",
            self.kernel
        )?;
        writeln!(f, "    ({});", self.args)
    }
}

/// The text of `source` with every marker line dropped and the call following
/// it replaced by its launch sequence.
pub fn expand_call_sites(source: &SourceFile, conventions: &Conventions) -> Result<String> {
    let mut out = String::with_capacity(source.text.len());
    let mut launches = 0usize;
    for segment in Statements::marked(source, conventions) {
        let stmt = match segment? {
            Segment::Line(line) => {
                out.push_str(line);
                continue;
            }
            Segment::Statement(stmt) => stmt,
        };
        let body = stmt.body(conventions);
        let call = parse_call(&body).map_err(|e| e.located(&source.path, stmt.first_line))?;
        let launch = Launch {
            name: &call.name,
            kernel: conventions.kernel_name(&call.name),
            args: call.args_text,
        };
        let _ = write!(out, "{launch}");
        launches += 1;
    }
    if launches > 0 {
        tracing::debug!(
            "{}: expanded {launches} offloaded call(s)",
            source.path.display()
        );
    }
    Ok(out)
}
