//! URL construction for API endpoints and web-app links.

use url::Url;

use crate::error::{Error, Result};

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|source| Error::InvalidUrl {
        url: base.to_string(),
        source,
    })
}

/// Joins `path` onto `base` and appends URL-encoded query pairs.
///
/// Any path already present on `base` is kept, so a proxy prefix such as
/// `https://proxy.example.com/sfx` works.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `base` is not an absolute URL.
pub fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url> {
    let mut url = parse_base(base)?;
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Builds a link into the single-page web app, e.g. `https://app.signalfx.com/#/chart/v2/ABC`.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `base` is not an absolute URL.
pub fn build_app_url(base: &str, fragment: &str) -> Result<Url> {
    let mut url = parse_base(base)?;
    url.set_fragment(Some(fragment));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_path() {
        let url = build_url("https://api.signalfx.com", "/v2/chart/ABC", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.signalfx.com/v2/chart/ABC");
    }

    #[test]
    fn test_build_url_keeps_base_prefix() {
        let url = build_url("https://proxy.example.com/sfx/", "v2/team", &[]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/sfx/v2/team");
    }

    #[test]
    fn test_build_url_encodes_query() {
        let url = build_url(
            "https://api.signalfx.com",
            "/v2/detector",
            &[("name", "cpu high"), ("limit", "10")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.signalfx.com/v2/detector?name=cpu+high&limit=10"
        );
    }

    #[test]
    fn test_build_url_rejects_relative_base() {
        let err = build_url("api.signalfx.com", "/v2/chart", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_build_app_url_sets_fragment() {
        let url = build_app_url("https://app.signalfx.com", "/chart/v2/ABC").unwrap();
        assert_eq!(url.as_str(), "https://app.signalfx.com/#/chart/v2/ABC");
    }
}
