/// Hides everything after the host of an endpoint URL, where providers and
/// bot APIs put their credentials.
pub fn mask_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return "***".to_string();
    };
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    let base = &url[..scheme_end + 3 + host_end];

    if rest[host_end..].trim_matches('/').is_empty() {
        base.to_string()
    } else {
        format!("{base}/***/")
    }
}
