mod engine;
mod registry;

pub use engine::{attempt, StrategyOutcome};
pub use registry::StrategyRegistry;

/// Normalized learning key: the lowercased registered domain (eTLD+1) of a
/// URL. `www.example.com` and `example.com` share a key; independent
/// subdomain behavior (e.g. `api.example.com` vs `www.example.com`) is a
/// known, accepted limitation — there is no public-suffix-list crate in this
/// codebase's dependency stack, so this uses a two-label heuristic rather
/// than a true public-suffix lookup.
pub fn host_key(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(registered_domain(&host))
}

fn registered_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }
    labels[labels.len() - 2..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn www_and_bare_domain_share_a_key() {
        assert_eq!(
            host_key("https://www.example.com/page").unwrap(),
            host_key("https://example.com/other").unwrap()
        );
    }

    #[test]
    fn deep_subdomain_collapses_to_registered_domain() {
        assert_eq!(
            host_key("https://a.b.example.com/x").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn invalid_url_yields_none() {
        assert!(host_key("not a url").is_none());
    }
}
