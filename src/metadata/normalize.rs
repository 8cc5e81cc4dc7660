use url::Url;

/// Excluded from thumbnail candidacy even though they parse fine.
const EXCLUDED_EXTENSIONS: [&str; 2] = [".svg", ".gif"];

/// Turn a raw image reference found on a page into an absolute, fetchable url.
///
/// Rejects (returns `None`):
/// - absent, empty or whitespace-only references
/// - `data:` URIs
/// - references whose path contains `.svg` or `.gif`
/// - anything that does not end up as an `http(s)` url
///
/// Protocol-relative references (`//host/...`) are upgraded to `https:`,
/// other references without a scheme are resolved against `base_url`.
pub fn resolve_image_url(base_url: &str, candidate: Option<&str>) -> Option<String> {
    let candidate = candidate?.trim();

    if candidate.is_empty() {
        return None;
    }

    if candidate
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
    {
        return None;
    }

    let path = candidate
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if EXCLUDED_EXTENSIONS.iter().any(|ext| path.contains(ext)) {
        return None;
    }

    let candidate = if candidate.starts_with("//") {
        format!("https:{candidate}")
    } else {
        candidate.to_string()
    };

    let resolved = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(base_url).ok()?.join(&candidate).ok()?
        }
        Err(err) => {
            log::debug!("{candidate}: invalid image url: {err}");
            return None;
        }
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Host of `url`, used as the platform lookup key. No normalization is
/// applied, `www.` and mobile subdomains are kept as they are.
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(str::to_string)
}
