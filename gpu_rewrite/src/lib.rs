/// Reserved markers, names and macros of the offload convention.
pub mod convention;
/// Fortran subroutines marked device-callable.
pub mod device_routines;
pub mod error;
/// Generated copy of a header with the device/kernel pairs appended.
pub mod header;
/// The grid-stride `__global__` wrapper.
pub mod kernel_template;
/// Launch sequences replacing `#pragma gpu` call sites.
pub mod launch;
/// Device/kernel pair for one declaration.
pub mod rewrite;
/// Declaration capture over the expanded and raw views of a header.
pub mod signature;
pub mod source;
/// Line-oriented statement scanner shared by every pass.
pub mod statement;
/// Tokenizer and parser for call expressions and prototypes.
pub mod syntax;
/// Offloaded call targets and their tagged argument positions.
pub mod targets;

pub use convention::Conventions;
pub use error::{Result, RewriteError};
pub use header::emit_header;
pub use launch::expand_call_sites;
pub use rewrite::{rewrite, GeneratedPair};
pub use signature::{scan_header, Declaration, HeaderScan, MacroExpander};
pub use source::SourceFile;
pub use targets::{collect, TargetRegistry};
