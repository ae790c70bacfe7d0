//! Outbound path computation.

/// Rewrite `original_path` for an upstream whose path starts at `base_path`.
///
/// The endpoint prefix is stripped and the remainder is joined to the base
/// path with exactly one `/`. An empty remainder maps to `base_path + "/"`.
///
/// Returns `None` when `original_path` does not start with `endpoint`; such a
/// request must not be proxied.
pub fn rewrite_path(original_path: &str, endpoint: &str, base_path: &str) -> Option<String> {
    let remainder = original_path.strip_prefix(endpoint)?;

    let mut out = String::with_capacity(base_path.len() + remainder.len() + 1);
    out.push_str(base_path);
    if !remainder.starts_with('/') {
        out.push('/');
    }
    out.push_str(remainder);
    Some(out)
}
