//! Language code normalization and fallback resolution.
//!
//! Rule sets, mapping tables and per-language configuration are all keyed by
//! a normalized code and looked up through the same fallback chain.

use crate::defaults::UNKNOWN_LANGUAGE;

/// Normalize a language hint: trim, lowercase, `_` to `-`.
///
/// Absent or empty hints normalize to `"unknown"`.
pub fn normalize(code: Option<&str>) -> String {
    let normalized = code
        .map(|c| c.trim().to_lowercase().replace('_', "-"))
        .unwrap_or_default();
    if normalized.is_empty() {
        UNKNOWN_LANGUAGE.to_string()
    } else {
        normalized
    }
}

/// Whether a normalized code carries no language information.
pub fn is_unknown(code: &str) -> bool {
    code == UNKNOWN_LANGUAGE
}

/// Candidate keys for a normalized code, most specific first.
///
/// `"pt-br"` yields `["pt-br", "pt"]`. The unknown language yields nothing,
/// so callers go straight to their universal layer.
pub fn fallback_chain(code: &str) -> Vec<String> {
    if is_unknown(code) {
        return Vec::new();
    }
    let mut chain = vec![code.to_string()];
    if let Some((base, _region)) = code.split_once('-')
        && !base.is_empty()
    {
        chain.push(base.to_string());
    }
    chain
}
