//! Index of Fortran subroutines that are compiled for the device, i.e. marked
//! `AMREX_DEVICE subroutine name` or `attributes(device) subroutine name`.

use std::collections::BTreeSet;

use crate::source::SourceFile;

fn words(line: &str) -> Vec<String> {
    let code = match line.find('!') {
        Some(idx) => &line[..idx],
        None => line,
    };
    code.split(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Lowercase names of the device subroutines defined in `source`.
pub fn device_routines(source: &SourceFile) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for line in source.text.lines() {
        let words = words(line);
        let name = match words.as_slice() {
            [marker, sub, name, ..] if marker == "amrex_device" && sub == "subroutine" => name,
            [attr, device, sub, name, ..]
                if attr == "attributes" && device == "device" && sub == "subroutine" =>
            {
                name
            }
            _ => continue,
        };
        found.insert(name.clone());
    }
    found
}

pub fn collect_device_routines(sources: &[SourceFile]) -> BTreeSet<String> {
    sources.iter().flat_map(device_routines).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_finds_both_spellings() {
        let src = SourceFile::new(
            "Castro_nd.F90",
            "module m\ncontains\n  AMREX_DEVICE subroutine ca_ctoprim(lo, hi) bind(C)\n  end subroutine\n  attributes(device) Subroutine Ca_Fill (lo, hi)\n  subroutine host_only(x)\n  ! AMREX_DEVICE subroutine commented_out()\nend module\n",
        );
        let names: Vec<_> = device_routines(&src).into_iter().collect();
        assert_eq!(names, vec!["ca_ctoprim", "ca_fill"]);
    }

    #[test]
    fn test_collects_across_files() {
        let a = SourceFile::new("a.F90", "AMREX_DEVICE subroutine a_sub()\n");
        let b = SourceFile::new("b.F90", "AMREX_DEVICE subroutine b_sub()\n");
        let all = collect_device_routines(&[a, b]);
        assert!(all.contains("a_sub"));
        assert!(all.contains("b_sub"));
    }
}
