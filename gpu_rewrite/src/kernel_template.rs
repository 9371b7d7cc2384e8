//! The generic `__global__` wrapper: a grid-stride loop over the three spatial
//! dimensions which calls the device function once per cell.

use std::fmt;

/// Spatial dimension of the launch grid, matching CUDA's `dim3` components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Loop nesting order: `z` outermost so `x` (contiguous in memory) is
    /// the innermost loop.
    pub const OUTER_TO_INNER: [Axis; 3] = [Axis::Z, Axis::Y, Axis::X];

    pub fn component(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub fn loop_var(&self) -> &'static str {
        match self {
            Self::X => "i",
            Self::Y => "j",
            Self::Z => "k",
        }
    }

    /// First index handled by this thread along the axis.
    fn thread_start(&self, lower: &str) -> String {
        let c = self.component();
        format!(
            "{lower}[{}] + blockIdx.{c} * blockDim.{c} + threadIdx.{c}",
            self.index()
        )
    }

    /// Distance between consecutive indices handled by one thread.
    fn grid_stride(&self) -> String {
        let c = self.component();
        format!("blockDim.{c} * gridDim.{c}")
    }
}

/// A fully specified instance of the wrapper kernel.
#[derive(Clone, Debug)]
pub struct GridStrideKernel<'a> {
    /// `name(params)` of the kernel, without qualifiers.
    pub signature: &'a str,
    /// Local declarations placed before the loops.
    pub locals: &'a [String],
    /// Arrays holding the inclusive index range of the launch.
    pub lower: &'a str,
    pub upper: &'a str,
    /// Per-thread single-cell bounds passed on to the device function.
    pub lower_local: &'a str,
    pub upper_local: &'a str,
    /// Device call made once per cell, without the trailing `;`.
    pub call: &'a str,
}

const BASE_INDENT: usize = 3;
const LEVEL_INDENT: usize = 2;

impl fmt::Display for GridStrideKernel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "__global__ static void {}", self.signature)?;
        writeln!(f, "{{")?;
        let pad = " ".repeat(BASE_INDENT);
        for local in self.locals {
            writeln!(f, "{pad}{local}")?;
        }
        writeln!(f)?;
        writeln!(f, "{pad}int {}[3];", self.lower_local)?;
        writeln!(f, "{pad}int {}[3];", self.upper_local)?;

        for (depth, axis) in Axis::OUTER_TO_INNER.iter().enumerate() {
            let outer = " ".repeat(BASE_INDENT + depth * LEVEL_INDENT);
            let inner = " ".repeat(BASE_INDENT + (depth + 1) * LEVEL_INDENT);
            let var = axis.loop_var();
            let idx = axis.index();
            writeln!(
                f,
                "{outer}for (int {var} = {}; {var} <= {}[{idx}]; {var} += {}) {{",
                axis.thread_start(self.lower),
                self.upper,
                axis.grid_stride()
            )?;
            writeln!(f, "{inner}{}[{idx}] = {var};", self.lower_local)?;
            writeln!(f, "{inner}{}[{idx}] = {var};", self.upper_local)?;
        }

        let innermost = " ".repeat(BASE_INDENT + Axis::OUTER_TO_INNER.len() * LEVEL_INDENT);
        writeln!(f, "{innermost}{};", self.call)?;
        for depth in (0..Axis::OUTER_TO_INNER.len()).rev() {
            writeln!(f, "{}}}", " ".repeat(BASE_INDENT + depth * LEVEL_INDENT))?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kernel(locals: &[String]) -> String {
        GridStrideKernel {
            signature: "cuda_bar(const int lo_1, const int lo_2, const int lo_3, const int hi_1, const int hi_2, const int hi_3, Real* a)",
            locals,
            lower: "lo",
            upper: "hi",
            lower_local: "blo",
            upper_local: "bhi",
            call: "bar_device(blo, bhi, a)",
        }
        .to_string()
    }

    #[test]
    fn test_loops_nest_z_y_x() {
        let out = kernel(&[]);
        let k = out.find("for (int k = lo[2] + blockIdx.z * blockDim.z + threadIdx.z; k <= hi[2]; k += blockDim.z * gridDim.z) {").unwrap();
        let j = out.find("for (int j = lo[1] + blockIdx.y * blockDim.y + threadIdx.y; j <= hi[1]; j += blockDim.y * gridDim.y) {").unwrap();
        let i = out.find("for (int i = lo[0] + blockIdx.x * blockDim.x + threadIdx.x; i <= hi[0]; i += blockDim.x * gridDim.x) {").unwrap();
        assert!(k < j && j < i);
    }

    #[test]
    fn test_single_cell_bounds_and_one_call() {
        let out = kernel(&[]);
        for (axis, var) in [(0, "i"), (1, "j"), (2, "k")] {
            assert!(out.contains(&format!("blo[{axis}] = {var};")));
            assert!(out.contains(&format!("bhi[{axis}] = {var};")));
        }
        assert_eq!(out.matches("bar_device(blo, bhi, a);").count(), 1);
        assert!(out.contains("\n         bar_device(blo, bhi, a);\n"));
    }

    #[test]
    fn test_braces_balance() {
        let out = kernel(&[String::from("int lo[3] = {lo_1, lo_2, lo_3};")]);
        assert_eq!(out.matches('{').count(), out.matches('}').count());
        assert!(out.starts_with("__global__ static void cuda_bar("));
        assert!(out.ends_with("   }\n}\n"));
    }

    #[test]
    fn test_locals_come_first() {
        let locals = [
            String::from("int lo[3] = {lo_1, lo_2, lo_3};"),
            String::from("int hi[3] = {hi_1, hi_2, hi_3};"),
        ];
        let out = kernel(&locals);
        let lo = out.find("   int lo[3] = {lo_1, lo_2, lo_3};\n").unwrap();
        let hi = out.find("   int hi[3] = {hi_1, hi_2, hi_3};\n").unwrap();
        let blo = out.find("   int blo[3];\n").unwrap();
        assert!(lo < hi && hi < blo);
    }
}
