use std::ffi::{CStr, CString};

/// Outcome of matching wanted layer/extension names against available ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameResolution {
    /// Wanted names that are available, in request order.
    pub found: Vec<CString>,
    /// Wanted names that are not available, in request order.
    pub missing: Vec<CString>,
}

/// Splits `wanted` by exact-string membership in `available`.
pub fn resolve_names<'a, I>(wanted: &[CString], available: I) -> NameResolution
where
    I: IntoIterator<Item = &'a CStr>,
{
    let available: Vec<&CStr> = available.into_iter().collect();
    let mut out = NameResolution::default();

    for name in wanted {
        if available.iter().any(|a| *a == name.as_c_str()) {
            out.found.push(name.clone());
        } else {
            out.missing.push(name.clone());
        }
    }

    out
}
