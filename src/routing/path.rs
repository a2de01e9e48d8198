//! Registry v2 path and query normalization.
//!
//! Docker Hub serves official images under the implicit `library/`
//! namespace, so `nginx` must reach the registry as `library/nginx`.

const V2_PREFIX: &str = "/v2/";
const LIBRARY_PREFIX: &str = "/v2/library/";
const ENCODED_COLON: &str = "%3A";
const ENCODED_SLASH: &str = "%2F";
const ENCODED_LIBRARY: &str = "library%2F";

/// True for `/v2/<a>/<b>/<c>`: exactly three non-empty segments after `/v2/`.
pub fn is_v2_image_path(path: &str) -> bool {
    match path.strip_prefix(V2_PREFIX) {
        Some(rest) => {
            let segments: Vec<&str> = rest.split('/').collect();
            segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
        }
        None => false,
    }
}

/// Insert the implicit `library/` namespace for default-registry image paths.
///
/// Any other path shape, or any other registry, is returned unchanged.
pub fn normalize_path(path: &str, upstream_host: &str, default_registry: &str) -> String {
    if upstream_host == default_registry
        && is_v2_image_path(path)
        && !path.starts_with(LIBRARY_PREFIX)
    {
        format!("{}library/{}", V2_PREFIX, &path[V2_PREFIX.len()..])
    } else {
        path.to_string()
    }
}

/// Repair encoded image references that lost their namespace.
///
/// When the raw query has an encoded colon but no encoded slash,
/// `library%2F` goes right after the first `%3A`, but only if another
/// parameter follows it. A trailing `digest=sha256%3A...` is left alone.
/// Returns `None` when no repair applies.
pub fn repair_encoded_query(query: &str) -> Option<String> {
    if query.contains(ENCODED_SLASH) {
        return None;
    }
    let idx = query.find(ENCODED_COLON)? + ENCODED_COLON.len();
    if !query[idx..].contains('&') {
        return None;
    }
    let mut repaired = String::with_capacity(query.len() + ENCODED_LIBRARY.len());
    repaired.push_str(&query[..idx]);
    repaired.push_str(ENCODED_LIBRARY);
    repaired.push_str(&query[idx..]);
    Some(repaired)
}
