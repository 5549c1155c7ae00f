use url::Url;

/// Resolve `link` against `base` and return it only if the result is an
/// absolute `http`/`https` URL.
///
/// Already-absolute links are re-serialized through the URL parser so that
/// equal URLs compare equal as strings.
pub fn resolve_url(link: &str, base: Option<&Url>) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let resolved = match Url::parse(link) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(link).ok()?,
        Err(_) => return None,
    };

    if is_web_url(&resolved) {
        Some(resolved.to_string())
    } else {
        None
    }
}

/// Parse a base URL, accepting only `http`/`https`.
pub fn parse_base(base_url: &str) -> Option<Url> {
    Url::parse(base_url.trim()).ok().filter(is_web_url)
}

pub fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// True when `candidate` is a string the record schema accepts as an image
/// reference.
pub fn is_absolute_web_url(candidate: &str) -> bool {
    Url::parse(candidate).map(|u| is_web_url(&u)).unwrap_or(false)
}
