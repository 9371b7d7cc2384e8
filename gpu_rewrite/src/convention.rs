/// Reserved tokens and names shared by every stage of the rewrite.
///
/// The defaults reproduce the AMReX offload convention: `#pragma gpu` call
/// sites, `void name(...)` Fortran bindings with `lo`/`hi` index bounds, and
/// `AMREX_INT_ANYD` tagged arguments.
#[derive(Clone, Debug)]
pub struct Conventions {
    /// Line prefix which marks the following statement as an offloaded call.
    pub marker: String,
    pub terminator: char,
    pub comment: String,
    /// Return type every offloadable declaration starts with.
    pub return_type: String,
    /// Argument tokens whose positions are recorded at each call site.
    pub tags: Vec<String>,
    pub lower_bound: String,
    pub upper_bound: String,
    /// Template locals standing in for `lower_bound`/`upper_bound` inside the
    /// kernel body; they hold a single-cell box per thread.
    pub lower_local: String,
    pub upper_local: String,
    pub device_suffix: String,
    pub kernel_prefix: String,
    /// `(by-reference macro, by-value macro)` pairs for array descriptors.
    pub array_descriptors: Vec<(String, String)>,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            marker: String::from("#pragma gpu"),
            terminator: ';',
            comment: String::from("//"),
            return_type: String::from("void"),
            tags: vec![String::from("AMREX_INT_ANYD")],
            lower_bound: String::from("lo"),
            upper_bound: String::from("hi"),
            lower_local: String::from("blo"),
            upper_local: String::from("bhi"),
            device_suffix: String::from("_device"),
            kernel_prefix: String::from("cuda_"),
            array_descriptors: vec![
                (
                    String::from("BL_FORT_FAB_ARG_3D"),
                    String::from("BL_FORT_FAB_VAL_3D"),
                ),
                (
                    String::from("BL_FORT_IFAB_ARG_3D"),
                    String::from("BL_FORT_FAB_VAL_3D"),
                ),
            ],
        }
    }
}

impl Conventions {
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn is_marker(&self, line: &str) -> bool {
        line.starts_with(self.marker.as_str())
    }

    /// Drops everything from the first line comment onwards.
    pub fn strip_comment<'a>(&self, line: &'a str) -> &'a str {
        match line.find(self.comment.as_str()) {
            Some(idx) => &line[..idx],
            None => line,
        }
    }

    pub fn is_terminated(&self, line: &str) -> bool {
        self.strip_comment(line)
            .trim_end()
            .ends_with(self.terminator)
    }

    pub fn device_name(&self, name: &str) -> String {
        format!("{name}{}", self.device_suffix)
    }

    /// Name of the `__global__` wrapper. Call sites and generated headers both
    /// go through here, so the two always agree.
    pub fn kernel_name(&self, name: &str) -> String {
        format!("{}{name}", self.kernel_prefix)
    }

    pub fn value_descriptor(&self, name: &str) -> Option<String> {
        self.array_descriptors
            .iter()
            .find(|(by_ref, _)| name.contains(by_ref.as_str()))
            .map(|(by_ref, by_val)| name.replace(by_ref.as_str(), by_val))
    }

    pub fn bound_role(&self, name: &str) -> Option<Bound> {
        if name == self.lower_bound {
            Some(Bound::Lower)
        } else if name == self.upper_bound {
            Some(Bound::Upper)
        } else {
            None
        }
    }

    pub fn bound_local(&self, bound: Bound) -> &str {
        match bound {
            Bound::Lower => &self.lower_local,
            Bound::Upper => &self.upper_local,
        }
    }

    pub fn bound_name(&self, bound: Bound) -> &str {
        match bound {
            Bound::Lower => &self.lower_bound,
            Bound::Upper => &self.upper_bound,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

impl Bound {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
        }
    }
}
