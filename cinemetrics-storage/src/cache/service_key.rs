//! Method-scoped cache keys for the service layer.
//!
//! A `ServiceKey` can only be built from an owner, a method name and the
//! call's arguments. Two methods with identical argument shapes therefore
//! never share an entry.

use cinemetrics_core::{Fingerprint, KeyArgs, QueryRequest};
use std::fmt;

/// Owner prefix used for every dashboard query key.
pub const SERVICE_OWNER: &str = "DataService";

/// A cache key of the form `<owner>.<method>:<fingerprint>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    /// Private inner data - cannot be constructed externally
    inner: ServiceKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ServiceKeyInner {
    owner: String,
    method: String,
    fingerprint: Fingerprint,
    rendered: String,
}

impl ServiceKey {
    /// Derive a key for `owner.method(args)`.
    pub fn new(owner: &str, method: &str, args: &KeyArgs) -> Self {
        Self::from_parts(owner, method, args.fingerprint())
    }

    /// Key for a dashboard query: its service method plus every argument
    /// that changes the result.
    pub fn for_request(request: &QueryRequest) -> Self {
        Self::new(
            SERVICE_OWNER,
            request.kind().method_name(),
            &request.service_key_args(),
        )
    }

    fn from_parts(owner: &str, method: &str, fingerprint: Fingerprint) -> Self {
        let rendered = format!("{owner}.{method}:{fingerprint}");
        Self {
            inner: ServiceKeyInner {
                owner: owner.to_string(),
                method: method.to_string(),
                fingerprint,
                rendered,
            },
        }
    }

    pub fn owner(&self) -> &str {
        &self.inner.owner
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.inner.fingerprint
    }

    pub fn as_str(&self) -> &str {
        &self.inner.rendered
    }

    /// Parse a rendered key.
    ///
    /// Returns `None` if:
    /// - The `.` between owner and method or the `:` before the fingerprint is missing
    /// - Owner or method is empty
    /// - The fingerprint is not 64 lowercase hex characters
    pub fn parse(text: &str) -> Option<Self> {
        let (scope, digest) = text.rsplit_once(':')?;
        let (owner, method) = scope.split_once('.')?;
        if owner.is_empty() || method.is_empty() {
            return None;
        }
        let fingerprint = Fingerprint::parse(digest)?;
        Some(Self::from_parts(owner, method, fingerprint))
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.rendered)
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinemetrics_core::{FilterInput, QueryKind, QuerySettings, FINGERPRINT_HEX_LEN};

    fn scenario_input() -> FilterInput {
        FilterInput {
            date_range: Some(vec![
                Some("2000-01-01".to_string()),
                Some("2010-01-01".to_string()),
            ]),
            genres: Some(vec![]),
            rating_range: Some(vec![7.0, 10.0]),
            runtime_range: Some(vec![0, 300]),
        }
    }

    #[test]
    fn test_key_format() {
        let key = ServiceKey::new("DataService", "get_year_range", &KeyArgs::new());
        let text = key.as_str();
        assert!(text.starts_with("DataService.get_year_range:"));
        assert_eq!(
            text.len(),
            "DataService.get_year_range:".len() + FINGERPRINT_HEX_LEN
        );
    }

    #[test]
    fn test_methods_with_same_args_do_not_collide() {
        let a = ServiceKey::new(SERVICE_OWNER, "get_year_range", &KeyArgs::new());
        let b = ServiceKey::new(SERVICE_OWNER, "get_unique_genres", &KeyArgs::new());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a, b);
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_top_movies_key_includes_settings() {
        let input = scenario_input();
        let default = QueryKind::TopMovies
            .request(&input, &QuerySettings::default())
            .unwrap();
        let wider = QueryKind::TopMovies
            .request(
                &input,
                &QuerySettings {
                    top_n_movies: 50,
                    ..QuerySettings::default()
                },
            )
            .unwrap();

        // Same filters, so the client-side fingerprint agrees...
        assert_eq!(default.fingerprint(), wider.fingerprint());
        // ...but the service result differs, so the server key must too.
        assert_ne!(ServiceKey::for_request(&default), ServiceKey::for_request(&wider));
        assert_eq!(ServiceKey::for_request(&default).method(), "get_top_movies");
    }

    #[test]
    fn test_parse_round_trip() {
        let key = ServiceKey::new(SERVICE_OWNER, "get_genre_trends", &KeyArgs::new().arg(&1));
        assert_eq!(ServiceKey::parse(key.as_str()), Some(key));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(ServiceKey::parse(""), None);
        assert_eq!(ServiceKey::parse("DataService.get_year_range"), None);
        assert_eq!(ServiceKey::parse("DataService.get_year_range:abc"), None);
        assert_eq!(ServiceKey::parse(&format!(".m:{}", "a".repeat(64))), None);
        assert_eq!(ServiceKey::parse(&format!("Owner:{}", "a".repeat(64))), None);
        assert_eq!(ServiceKey::parse(&format!("O.m:{}", "A".repeat(64))), None);
    }
}
