// --- Route Path Composition ---

/// join
///
/// Composes a base prefix with a further segment. Both sides are split on `/`,
/// empty pieces are dropped and the rest is re-joined with a single `/`.
///
/// The result never carries a leading or trailing slash, which makes the
/// composition associative: `join(join("a", "b"), "c") == join("a", "b/c")`.
/// An empty segment leaves the base unchanged.
pub fn join(base: &str, segment: &str) -> String {
    base.split('/')
        .chain(segment.split('/'))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// route_path
///
/// Produces the absolute path handed to axum for a route registered with `path`
/// on a group whose prefix is `prefix`. Always starts with `/`.
pub fn route_path(prefix: &str, path: &str) -> String {
    format!("/{}", join(prefix, path))
}
