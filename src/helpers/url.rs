//! URL helper functions

/// Check whether a string already carries a scheme
pub fn has_scheme(s: &str) -> bool {
    s.split_once("://")
        .map(|(scheme, _)| {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        })
        .unwrap_or(false)
}

/// Join a relative reference against a base URL
///
/// Absolute references pass through unchanged. A reference starting with
/// `/` replaces the base's path, everything else resolves against the
/// base's directory.
pub fn join_url(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return base.to_string();
    }
    if has_scheme(reference) {
        return reference.to_string();
    }

    if let Some(rest) = reference.strip_prefix('/') {
        let origin = url_origin(base);
        return format!("{}/{}", origin.trim_end_matches('/'), rest);
    }

    // Resolve against the directory of the base path.
    match base.rfind('/') {
        Some(idx) if idx > base.find("://").map(|i| i + 2).unwrap_or(0) => {
            format!("{}/{}", &base[..idx], reference)
        }
        _ => format!("{}/{}", base.trim_end_matches('/'), reference),
    }
}

/// Scheme plus authority of a URL, without any path
fn url_origin(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => {
            let after = idx + 3;
            match url[after..].find('/') {
                Some(path) => &url[..after + path],
                None => url,
            }
        }
        None => url,
    }
}
