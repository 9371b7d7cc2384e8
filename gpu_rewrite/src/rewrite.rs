//! Turns one captured declaration into the device/kernel pair.
//!
//! Index-range parameters (`lo`, `hi`) and tagged parameters arrive at the
//! kernel as three scalar ints each, so they can be passed by value at launch,
//! and are rebuilt into `int v[3]` locals inside the kernel body. The device
//! function keeps its original signature.

use crate::{
    convention::{Bound, Conventions},
    error::{Result, RewriteError},
    kernel_template::GridStrideKernel,
    signature::Declaration,
    syntax::parse_prototype,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamRole {
    Plain,
    LowerBound,
    UpperBound,
    Tagged,
    ArrayDescriptor,
}

impl From<Bound> for ParamRole {
    fn from(value: Bound) -> Self {
        match value {
            Bound::Lower => Self::LowerBound,
            Bound::Upper => Self::UpperBound,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    /// Declared name, sigils stripped.
    pub name: String,
    pub role: ParamRole,
    /// Tag recorded for this position at the call site.
    pub tag: Option<String>,
    /// Argument passed to the device function from inside the kernel.
    pub forward: String,
    /// Whether the kernel takes this parameter as three scalar ints.
    pub split: bool,
}

impl ParamSpec {
    fn scalar_params(&self) -> String {
        let n = &self.name;
        format!("const int {n}_1, const int {n}_2, const int {n}_3")
    }

    fn local_array(&self) -> String {
        let n = &self.name;
        format!("int {n}[3] = {{{n}_1, {n}_2, {n}_3}};")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedPair {
    pub device: String,
    pub kernel: String,
}

fn param_spec(position: usize, name: &str, decl: &Declaration, conventions: &Conventions) -> ParamSpec {
    let tag = decl.tags.tag_at(position).map(str::to_string);
    let bound = conventions.bound_role(name);

    let (mut role, mut forward) = match conventions.value_descriptor(name) {
        Some(by_value) => (ParamRole::ArrayDescriptor, by_value),
        None => (ParamRole::Plain, name.to_string()),
    };
    if tag.is_some() {
        role = ParamRole::Tagged;
    }
    if let Some(bound) = bound {
        if let Some(tag) = &tag {
            tracing::debug!(
                "`{}`: parameter `{name}` is both tagged `{tag}` and the {} bound; treating it as the bound",
                decl.name,
                bound.as_str()
            );
        }
        role = bound.into();
        forward = conventions.bound_local(bound).to_string();
    }

    ParamSpec {
        name: name.to_string(),
        role,
        split: tag.is_some() || bound.is_some(),
        tag,
        forward,
    }
}

/// Classifies every parameter of `decl`, checking the tag positions and the
/// `lo`/`hi` convention on the way.
pub fn param_specs(decl: &Declaration, conventions: &Conventions) -> Result<Vec<ParamSpec>> {
    let proto = parse_prototype(&decl.text, &conventions.return_type)?;

    if let Some((tag, position)) = decl.tags.iter().find(|&(_, p)| p >= proto.params.len()) {
        return Err(RewriteError::TagOutOfRange {
            function: decl.name.clone(),
            tag: tag.to_string(),
            position,
            params: proto.params.len(),
        });
    }

    let specs: Vec<ParamSpec> = proto
        .params
        .iter()
        .enumerate()
        .map(|(position, param)| param_spec(position, param.name, decl, conventions))
        .collect();

    let count = |role| specs.iter().filter(|s| s.role == role).count();
    if count(ParamRole::LowerBound) != 1 || count(ParamRole::UpperBound) != 1 {
        return Err(RewriteError::ConventionViolation {
            function: decl.name.clone(),
            signature: decl.text.clone(),
            lower: conventions.bound_name(Bound::Lower).to_string(),
            upper: conventions.bound_name(Bound::Upper).to_string(),
        });
    }

    Ok(specs)
}

pub fn rewrite(decl: &Declaration, conventions: &Conventions) -> Result<GeneratedPair> {
    let proto = parse_prototype(&decl.text, &conventions.return_type)?;
    let specs = param_specs(decl, conventions)?;
    let name = proto.name();

    let original: Vec<&str> = proto.params.iter().map(|p| p.text).collect();
    let device = format!(
        "__device__ {};",
        proto.splice(0, &conventions.device_name(name), &original)
    );

    let kernel_params: Vec<String> = specs
        .iter()
        .zip(&proto.params)
        .map(|(spec, param)| {
            if spec.split {
                spec.scalar_params()
            } else {
                param.text.to_string()
            }
        })
        .collect();
    let signature = proto.splice(
        proto.name_span.start,
        &conventions.kernel_name(name),
        &kernel_params,
    );

    let locals: Vec<String> = specs
        .iter()
        .filter(|s| s.split)
        .map(ParamSpec::local_array)
        .collect();
    let forwards: Vec<&str> = specs.iter().map(|s| s.forward.as_str()).collect();
    let call = format!("{}({})", conventions.device_name(name), forwards.join(", "));

    let kernel = GridStrideKernel {
        signature: &signature,
        locals: &locals,
        lower: &conventions.lower_bound,
        upper: &conventions.upper_bound,
        lower_local: &conventions.lower_local,
        upper_local: &conventions.upper_local,
        call: &call,
    }
    .to_string();

    Ok(GeneratedPair { device, kernel })
}
